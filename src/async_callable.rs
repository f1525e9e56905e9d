//! The async counterpart of [`crate::callable::Callable`], for jobs whose
//! work function returns a future instead of running synchronously.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::callable::{IntoOutcome, Outcome};

type CallableResult = std::result::Result<Outcome, Box<dyn std::error::Error + Send + Sync>>;
type BoxFuture<'a> = Pin<Box<dyn Future<Output = CallableResult> + Send + 'a>>;

/// A scheduled unit of async work. Implemented once per argument arity by
/// the `*ToOutcome` structs below.
pub trait AsyncCallable: Send + Sync {
    fn call(&self) -> BoxFuture<'_>;
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn AsyncCallable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AsyncCallable({})", self.name())
    }
}

impl PartialEq for dyn AsyncCallable {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for dyn AsyncCallable {}

macro_rules! async_callable_arity {
    ($name:ident, $($arg:ident : $ty:ident),*) => {
        #[doc = concat!("An async named callable taking ", stringify!($($ty),*), ".")]
        pub struct $name<Fut, R, $($ty),*>
        where
            Fut: Future<Output = R> + Send,
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            name: String,
            work: fn($($ty),*) -> Fut,
            $($arg: $ty,)*
        }

        impl<Fut, R, $($ty),*> $name<Fut, R, $($ty),*>
        where
            Fut: Future<Output = R> + Send,
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            #[allow(clippy::too_many_arguments)]
            pub fn new(name: impl Into<String>, work: fn($($ty),*) -> Fut, $($arg: $ty),*) -> Self {
                Self { name: name.into(), work, $($arg),* }
            }
        }

        impl<Fut, R, $($ty),*> AsyncCallable for $name<Fut, R, $($ty),*>
        where
            Fut: Future<Output = R> + Send,
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            fn call(&self) -> BoxFuture<'_> {
                $(let $arg = self.$arg.clone();)*
                let fut = (self.work)($($arg),*);
                Box::pin(async move { fut.await.into_outcome() })
            }
            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

async_callable_arity!(AsyncNullaryCallable,);
async_callable_arity!(AsyncUnaryCallable, arg1: T1);
async_callable_arity!(AsyncBinaryCallable, arg1: T1, arg2: T2);
async_callable_arity!(AsyncTernaryCallable, arg1: T1, arg2: T2, arg3: T3);

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop() {}
    async fn cancels() -> Outcome {
        Outcome::Cancel
    }

    #[test]
    fn unit_future_continues() {
        let c = AsyncNullaryCallable::new("noop", noop);
        assert_eq!(futures::executor::block_on(c.call()).unwrap(), Outcome::Continue);
    }

    #[test]
    fn future_outcome_passes_through() {
        let c = AsyncNullaryCallable::new("cancels", cancels);
        assert_eq!(futures::executor::block_on(c.call()).unwrap(), Outcome::Cancel);
    }
}
