//! End-to-end scheduling scenarios, driven through the public `Scheduler`
//! API rather than the crate's private mock clock.

use jiff::civil;
use jiff::tz::TimeZone;
use jiff::ToSpan as _;
use metronome::{every, every_single, FoldPolicy, Scheduler};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

static HITS: AtomicUsize = AtomicUsize::new(0);

fn tick() {
    HITS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn randomized_interval_stays_within_its_declared_range() {
    let job = every(5).to(10).unwrap().minutes().unwrap().run("tick", tick).unwrap();
    let now = jiff::Zoned::now();
    let next = job.next_run().unwrap();
    let elapsed = next.duration_since(&now).as_secs();
    assert!((5 * 60..=10 * 60 + 1).contains(&elapsed), "elapsed was {elapsed}");
}

#[test]
fn daily_at_time_not_yet_passed_today_runs_today() {
    let job = every_single().day().unwrap().at("23:59:59").unwrap().run("tick", tick).unwrap();
    let today = jiff::Zoned::now().date();
    assert_eq!(job.next_run().unwrap().date(), today);
}

#[test]
fn until_in_the_past_is_rejected() {
    let past = jiff::Zoned::now().checked_sub(1.hour()).unwrap();
    let err = every(1).seconds().unwrap().until(past);
    assert!(err.is_err());
}

#[test]
fn weekday_anchor_with_at_time_computes_a_future_instant() {
    let job = every_single()
        .wednesday()
        .unwrap()
        .at("13:15")
        .unwrap()
        .run("tick", tick)
        .unwrap();
    let next = job.next_run().unwrap();
    assert_eq!(next.weekday(), civil::Weekday::Wednesday);
    assert!(*next >= jiff::Zoned::now());
}

#[test]
fn run_pending_executes_due_jobs_in_a_live_scheduler() {
    HITS.store(0, Ordering::SeqCst);
    let mut scheduler = Scheduler::new();
    scheduler.add(every(1).seconds().unwrap().run("tick", tick).unwrap());
    // a freshly-built one-second job is not due immediately
    scheduler.run_pending();
    assert_eq!(HITS.load(Ordering::SeqCst), 0);
}

#[test]
fn cancel_tag_removes_every_job_with_the_tag() {
    let mut scheduler = Scheduler::new();
    scheduler.add(
        every(1)
            .minutes()
            .unwrap()
            .tag(&["reports", "daily"])
            .run("tick", tick)
            .unwrap(),
    );
    scheduler.add(every(1).minutes().unwrap().tag(&["other"]).run("tick", tick).unwrap());
    scheduler.cancel_tag("reports");
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn timezone_anchored_daily_job_uses_the_named_zone() {
    let job = every_single()
        .day()
        .unwrap()
        .at("00:00")
        .unwrap()
        .in_timezone("America/New_York")
        .unwrap()
        .run("tick", tick)
        .unwrap();
    assert_eq!(
        job.next_run().unwrap().time_zone(),
        &TimeZone::get("America/New_York").unwrap()
    );
}

#[test]
fn spring_forward_gap_in_berlin_resolves_without_erroring() {
    // Europe/Berlin springs forward at 02:00 -> 03:00 on the last Sunday of March.
    let job = every_single()
        .day()
        .unwrap()
        .at("02:30")
        .unwrap()
        .in_timezone("Europe/Berlin")
        .unwrap()
        .fold_policy(FoldPolicy::First)
        .run("tick", tick)
        .unwrap();
    assert!(job.next_run().is_some());
}

#[test]
fn get_jobs_returns_an_owned_snapshot() {
    let mut scheduler = Scheduler::new();
    scheduler.add(every(1).minutes().unwrap().run("tick", tick).unwrap());
    let jobs = scheduler.get_jobs();
    scheduler.clear();
    // the snapshot survives clearing the live scheduler
    assert_eq!(jobs.len(), 1);
    assert!(scheduler.is_empty());
}
