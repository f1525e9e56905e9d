// A tour of the fluent builder across units, anchors, and deadlines.

#[cfg(feature = "random")]
use jiff::ToSpan as _;
use jiff::Zoned;
use metronome::{every, every_single, Scheduler};
use std::thread::sleep;
use std::time::Duration;

fn job() {
	let now = Zoned::now();
	println!("Hello, it's {now}!");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let mut schedule = Scheduler::new();

	schedule.add(every(10).seconds()?.run("job", job)?);
	schedule.add(every(10).minutes()?.run("job", job)?);
	schedule.add(every_single().hour()?.run("job", job)?);
	schedule.add(every_single().day()?.at("10:30")?.run("job", job)?);

	#[cfg(feature = "random")]
	schedule.add(every(5).to(10)?.minutes()?.run("job", job)?);

	schedule.add(every_single().monday()?.run("job", job)?);
	schedule.add(
		every_single()
			.wednesday()?
			.at("13:15")?
			.run("job", job)?,
	);

	#[cfg(feature = "random")]
	schedule.add(
		every(2)
			.to(8)?
			.seconds()?
			.until(Zoned::now().checked_add(5.seconds()).unwrap())?
			.run("job", job)?,
	);

	let now = Zoned::now();
	println!("Starting at {now}");
	loop {
		schedule.run_pending();
		sleep(Duration::from_secs(1));
	}
}
