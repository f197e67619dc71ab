// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end take sequencing through the public API.

use ordoplay_takes::{
    ConditionDesc, SequencerState, SharedFlag, Take, TakeDesc, TakeScript, TakeSequencer,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;

type Log = Rc<RefCell<Vec<String>>>;

fn record(take: &mut Take, log: &Log) {
    let name = take.name.clone();
    let start_log = Rc::clone(log);
    let start_name = name.clone();
    take.on_start
        .add_infallible(move || start_log.borrow_mut().push(format!("{start_name}.start")));
    let finish_log = Rc::clone(log);
    take.on_finish
        .add_infallible(move || finish_log.borrow_mut().push(format!("{name}.finish")));
}

#[test]
fn test_auto_take_then_flag_take_with_finish_delay() {
    let log = Log::default();

    let mut a = Take::auto("A");
    record(&mut a, &log);

    let (condition, flag) = SharedFlag::new("flag");
    let mut b = Take::new("B").with_condition(condition).with_delays(0.0, 2.0);
    record(&mut b, &log);

    let mut sequencer = TakeSequencer::started(vec![a, b]).unwrap();
    assert_eq!(*log.borrow(), vec!["A.start"]);

    sequencer.tick(1.0).unwrap();
    assert_eq!(*log.borrow(), vec!["A.start", "A.finish", "B.start"]);
    assert_eq!(sequencer.state(), SequencerState::Active);

    for _ in 0..10 {
        sequencer.tick(1.0).unwrap();
    }
    assert_eq!(sequencer.state(), SequencerState::Active);
    assert_eq!(sequencer.current_index(), Some(1));

    flag.store(true, Ordering::Release);
    sequencer.tick(1.0).unwrap();
    assert_eq!(sequencer.state(), SequencerState::Finishing);

    sequencer.tick(1.0).unwrap();
    assert_eq!(log.borrow().len(), 3);

    sequencer.tick(1.0).unwrap();
    assert_eq!(*log.borrow(), vec!["A.start", "A.finish", "B.start", "B.finish"]);
    assert_eq!(sequencer.state(), SequencerState::Completed);

    // Completed sequencers ignore further ticks
    sequencer.tick(1.0).unwrap();
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn test_scripted_run_reaches_completion() {
    let mut script = TakeScript::new("Orientation");
    script.takes.push(TakeDesc::new("Fade in").with_delays(1.0, 0.5));
    script.takes.push(
        TakeDesc::new("Look at the guide").with_condition(ConditionDesc::Elapsed { secs: 3.0 }),
    );
    script.takes.push(
        TakeDesc::new("Press trigger")
            .with_condition(ConditionDesc::Signal { name: "trigger".to_string() }),
    );
    script.takes.push(TakeDesc {
        auto_finish: false,
        ..TakeDesc::new("Wait for operator")
    });

    let mut sequencer = TakeSequencer::started(script.build().unwrap()).unwrap();

    let mut ticks = 0;
    while !sequencer.state().is_terminal() && ticks < 10_000 {
        match sequencer.current_index() {
            Some(2) if ticks > 100 => sequencer.signals_mut().raise("trigger"),
            Some(3) if sequencer.state() == SequencerState::Active => {
                sequencer.skip_current_take();
            }
            _ => {}
        }
        sequencer.tick(0.1).unwrap();
        ticks += 1;
    }

    assert_eq!(sequencer.state(), SequencerState::Completed);
    assert!(ticks > 100);
    assert_eq!(sequencer.status_text(), "Current Take: Wait for operator (Completed)");
}
