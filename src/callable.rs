//! The work a scheduled job performs, and the protocol it uses to ask to be
//! rescheduled or unscheduled.

use std::fmt;

/// What a job's work function wants to happen next.
///
/// Returned explicitly by callables that want to unschedule themselves;
/// anything else (including plain `()` or a fallible `Result<(), E>`)
/// converts to `Outcome::Continue` via [`IntoOutcome`], so existing
/// fire-and-forget functions need no change to be schedulable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Run again at the next computed `next_run`.
    Continue,
    /// Unschedule this job; it will not run again.
    Cancel,
}

type CallableResult = std::result::Result<Outcome, Box<dyn std::error::Error + Send + Sync>>;

/// Converts a work function's return value into the cancel/reschedule
/// protocol the dispatcher understands.
pub trait IntoOutcome {
    fn into_outcome(self) -> CallableResult;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> CallableResult {
        Ok(Outcome::Continue)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> CallableResult {
        Ok(self)
    }
}

impl<E> IntoOutcome for std::result::Result<(), E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_outcome(self) -> CallableResult {
        match self {
            Ok(()) => Ok(Outcome::Continue),
            Err(e) => Err(Box::new(e)),
        }
    }
}

impl<E> IntoOutcome for std::result::Result<Outcome, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_outcome(self) -> CallableResult {
        self.map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

/// A scheduled unit of work. Implemented once per argument arity by the
/// `*ToOutcome` structs below; callers never implement this by hand.
pub trait Callable: Send + Sync {
    fn call(&self) -> CallableResult;
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn Callable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Callable({})", self.name())
    }
}

impl PartialEq for dyn Callable {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for dyn Callable {}

macro_rules! callable_arity {
    ($name:ident, $($arg:ident : $ty:ident),*) => {
        #[doc = concat!("A named callable taking ", stringify!($($ty),*), " and returning anything convertible to `Outcome`.")]
        pub struct $name<R, $($ty),*>
        where
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            name: String,
            work: fn($($ty),*) -> R,
            $($arg: $ty,)*
        }

        impl<R, $($ty),*> $name<R, $($ty),*>
        where
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            #[allow(clippy::too_many_arguments)]
            pub fn new(name: impl Into<String>, work: fn($($ty),*) -> R, $($arg: $ty),*) -> Self {
                Self { name: name.into(), work, $($arg),* }
            }
        }

        impl<R, $($ty),*> Callable for $name<R, $($ty),*>
        where
            R: IntoOutcome,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            fn call(&self) -> CallableResult {
                (self.work)($(self.$arg.clone()),*).into_outcome()
            }
            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

callable_arity!(NullaryCallable,);
callable_arity!(UnaryCallable, arg1: T1);
callable_arity!(BinaryCallable, arg1: T1, arg2: T2);
callable_arity!(TernaryCallable, arg1: T1, arg2: T2, arg3: T3);
callable_arity!(QuaternaryCallable, arg1: T1, arg2: T2, arg3: T3, arg4: T4);
callable_arity!(QuinaryCallable, arg1: T1, arg2: T2, arg3: T3, arg4: T4, arg5: T5);
callable_arity!(SenaryCallable, arg1: T1, arg2: T2, arg3: T3, arg4: T4, arg5: T5, arg6: T6);

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_job() {}
    fn cancelling_job() -> Outcome {
        Outcome::Cancel
    }

    #[test]
    fn unit_return_continues() {
        let c = NullaryCallable::new("ok_job", ok_job);
        assert_eq!(c.call().unwrap(), Outcome::Continue);
        assert_eq!(c.name(), "ok_job");
    }

    #[test]
    fn outcome_return_is_passed_through() {
        let c = NullaryCallable::new("cancelling_job", cancelling_job);
        assert_eq!(c.call().unwrap(), Outcome::Cancel);
    }

    #[test]
    fn one_arg_job_clones_its_argument() {
        fn greet(name: String) {
            assert_eq!(name, "Ferris");
        }
        let c = UnaryCallable::new("greet", greet, "Ferris".to_string());
        c.call().unwrap();
        c.call().unwrap(); // arg is cloned each call, not moved out
    }
}
