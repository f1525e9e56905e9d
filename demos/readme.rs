// This is the exact code from the README.md example

use jiff::{ToSpan as _, Zoned};
use metronome::{every, Scheduler};
use std::thread::sleep;
use std::time::Duration;

fn greet(name: String) {
	let now = Zoned::now();
	println!("Hello {name}, it's {now}!");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let mut schedule = Scheduler::new();

	schedule.add(
		every(2)
			.to(8)?
			.seconds()?
			.until(Zoned::now().checked_add(30.seconds())?)?
			.run_one_arg("greet", greet, "Cool Person".to_string())?,
	);

	let now = Zoned::now();
	println!("Starting at {now}");
	loop {
		schedule.run_pending();
		sleep(Duration::from_secs(1));
	}
}
