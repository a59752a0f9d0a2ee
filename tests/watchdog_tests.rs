mod common;

use common::Board;
use sensor_node_firmware::hal::{WatchdogMode, WatchdogTimeout};
use sensor_node_firmware::{Error, Phase};

const TIMEOUT: u64 = 1024;

#[test]
fn armed_with_configured_class() {
    let mut board = Board::new();
    assert!(!board.node.watchdog().is_armed());
    assert_eq!(board.boot(), Phase::Running);

    let config = board.node.watchdog().config().unwrap();
    assert_eq!(config.timeout, WatchdogTimeout::Ms1024);
    assert_eq!(config.mode, WatchdogMode::SystemReset);
    assert_eq!(config.timeout.as_millis() as u64, TIMEOUT);
}

#[test]
fn live_loop_never_resets() {
    let mut board = Board::new();
    board.boot();
    board.advance(10 * TIMEOUT);
    board.press();
    board.advance(200_000);
    assert_eq!(board.reset_at(), None);
    assert!(board.sim.0.borrow().feeds > 200_000);
}

#[test]
fn stalled_loop_resets_after_timeout() {
    let mut board = Board::new();
    board.boot();
    board.advance(5_000);
    board.main_loop = false;

    board.advance(TIMEOUT - 1);
    assert_eq!(board.reset_at(), None);
    board.advance(1);
    assert_eq!(board.reset_at(), Some(5_000 + TIMEOUT));
}

#[test]
fn late_acknowledge_still_resets() {
    let mut board = Board::new();
    board.boot();
    board.main_loop = false;
    board.advance(TIMEOUT);
    assert_eq!(board.reset_at(), Some(TIMEOUT));

    // Acknowledging after expiry does not undo the reset
    board.node.service_watchdog();
    assert_eq!(board.reset_at(), Some(TIMEOUT));
}

#[test]
fn acknowledge_just_in_time_is_enough() {
    let mut board = Board::new();
    board.boot();
    board.main_loop = false;
    for _ in 0..20 {
        board.advance(TIMEOUT - 1);
        board.node.service_watchdog();
    }
    assert_eq!(board.reset_at(), None);
}

#[test]
fn latched_fault_starves_the_watchdog() {
    let mut board = Board::new();
    board.boot();
    board.advance(2_000);

    board.node.latch_fault(Error::InvalidOperation);
    board.node.latch_fault(Error::Configuration);
    assert_eq!(board.node.fault(), Some(Error::InvalidOperation));
    assert!(!board.node.service_watchdog());

    board.advance(TIMEOUT);
    assert_eq!(board.reset_at(), Some(2_000 + TIMEOUT));
}
