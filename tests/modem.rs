mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use libmodem::gps::GpsFixState;
use libmodem::modem::{
    Config, DataError, Error, LifecycleState, NativeHttps, PreferredMode, SimFailurePolicy,
    SimFault, SimStatus, SocketHttp,
};
use libmodem::time::{CalendarTime, NetworkTime, TimeSyncState};

fn recorder() -> (Rc<RefCell<Vec<LifecycleState>>>, impl FnMut(LifecycleState)) {
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = states.clone();
    (states, move |state| sink.borrow_mut().push(state))
}

fn tick(modem: &mut TestModem, clock: &Clock, ms: u64) {
    clock.advance_ms(ms);
    modem.step();
}

#[test]
fn test_bring_up_with_automatic_registration() {
    let (modem, _clock) = modem(MockDriver::default());
    let (states, observer) = recorder();
    let mut modem = modem.with_observer(observer);

    assert_eq!(modem.state(), LifecycleState::Off);
    modem.begin().unwrap();
    assert_eq!(modem.driver().uart().baud_rate, Some(115_200));

    modem.step();

    assert_eq!(modem.state(), LifecycleState::Ready);
    assert!(modem.is_ready());
    assert_eq!(
        *states.borrow(),
        vec![
            LifecycleState::Starting,
            LifecycleState::WaitRegistration,
            LifecycleState::AcquiringFix,
            LifecycleState::Connecting,
            LifecycleState::Ready,
        ]
    );
    assert_eq!(modem.gps_state(), GpsFixState::Synced);
    assert_eq!(modem.gps_fix(), Some(&fix()));
    assert_eq!(modem.time_state(), TimeSyncState::Synced);
    assert_eq!(modem.platform().system_time, Some(FIX_UNIX));
    assert_eq!(modem.local_time().as_str(), "2024-04-02 11:39:57 UTC");

    // GPS is suspended for bearer activation, then switched back on
    assert!(modem.driver().gps_enabled);
    assert_eq!(modem.driver().bearer_waits, vec![20_000]);

    assert_eq!(modem.model(), "SIM7080");
    assert_eq!(modem.operator(), "Orange F");
    assert_eq!(modem.signal_quality(), 64);
}

#[test]
fn test_begin_is_ignored_unless_off() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    let pulses = modem.platform().power.levels.len();
    modem.begin().unwrap();
    assert_eq!(modem.platform().power.levels.len(), pulses);
    assert_eq!(modem.state(), LifecycleState::Starting);
}

#[test]
fn test_reset_line_is_pulsed_when_present() {
    let (mut modem, clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    // Power pulse only: low, high, low over 1.1 s
    assert_eq!(modem.platform().power.levels, vec![false, true, false]);
    assert_eq!(clock.now_ms(), 1_100);

    let mut platform = MockPlatform::default();
    platform.reset = Some(MockPin::default());
    let clock = platform.clock.clone();
    let mut modem = libmodem::modem::Modem::new(
        MockDriver::default(),
        platform,
        libmodem::gps::IntegratedGps,
        SocketHttp,
        Config::default(),
    );
    modem.begin().unwrap();
    let reset = modem.platform().reset.as_ref().unwrap();
    assert_eq!(reset.levels, vec![false, true, false]);
    assert_eq!(clock.now_ms(), 2_700 + 1_100);
}

#[test]
fn test_sim_init_configures_radio() {
    let mut config = Config::default();
    config.apn = "iot.1nce.net".try_into().unwrap();
    config.preferred_mode = PreferredMode::NbIot;
    let (mut modem, _clock) = modem_with(MockDriver::default(), config, SocketHttp);

    modem.begin().unwrap();
    modem.step();

    let sent = modem.driver_mut().sent();
    let expected = [
        "+CNMP=2",
        "+CBANDCFG=\"NB-IOT\",1,2,3,4,5,8,12,13,18,19,20,25,26,28,66,71,85",
        "+CBANDCFG=\"CAT-M\",1,2,3,4,5,8,12,13,14,18,19,20,25,26,27,28,66,85",
        "+CNCFG=0,1,\"iot.1nce.net\"",
        "+CGDCONT=1,\"IP\",\"iot.1nce.net\"",
        "+CMNB=2",
    ];
    assert_eq!(&sent[..expected.len()], &expected);
    assert!(sent.contains(&"+CNACT=0,1".to_string()));
    // No PIN configured
    assert_eq!(modem.driver().pins, vec![None]);
}

#[test]
fn test_wrong_pin_never_reaches_registration() {
    let mut driver = MockDriver::default();
    driver.init_ok = false;
    driver.sim = SimStatus::PinRequired;
    let mut config = Config::default();
    config.pin = "0000".try_into().unwrap();
    let (mut modem, clock) = modem_with(driver, config, SocketHttp);

    modem.begin().unwrap();
    for _ in 0..5 {
        tick(&mut modem, &clock, 2_000);
        assert_eq!(modem.state(), LifecycleState::Starting);
    }

    assert_eq!(modem.sim_fault(), Some(SimFault::PinRequired));
    assert_eq!(modem.driver().pins.len(), 5);
    assert_eq!(modem.driver().pins[0].as_deref(), Some("0000"));
    assert_eq!(modem.driver().registration_polls, 0);
    // Repowered after each failure
    assert_eq!(modem.platform().power.levels.len(), 3 * 6);

    // Fault clears once the SIM unlocks
    modem.driver_mut().init_ok = true;
    modem.step();
    assert_eq!(modem.sim_fault(), None);
    assert_ne!(modem.state(), LifecycleState::Starting);
}

#[test]
fn test_sim_fault_halts_when_configured() {
    let mut driver = MockDriver::default();
    driver.init_ok = false;
    driver.sim = SimStatus::Absent;
    let mut config = Config::default();
    config.sim_failure = SimFailurePolicy::Halt;
    let (modem, clock) = modem_with(driver, config, SocketHttp);
    let (states, observer) = recorder();
    let mut modem = modem.with_observer(observer);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Error);
    assert_eq!(modem.sim_fault(), Some(SimFault::NoSim));

    clock.advance_ms(60_000);
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Error);
    assert_eq!(modem.driver().pins.len(), 1);
    assert_eq!(
        *states.borrow(),
        vec![LifecycleState::Starting, LifecycleState::Error]
    );
}

#[test]
fn test_scan_filters_forbidden_and_tries_in_order() {
    let mut driver = MockDriver::default();
    driver.registered = false;
    driver.accepts = vec!["001", "003"];
    driver.registers_on = vec!["003"];
    driver.gps_fix = None;
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::WaitRegistration);
    assert_eq!(modem.registration_checks_left(), 6);

    for left in (1..6).rev() {
        tick(&mut modem, &clock, 2_000);
        assert_eq!(modem.registration_checks_left(), left);
        assert!(modem.candidate().is_none());
    }

    // Seventh failed check: scan and associate with the first candidate
    tick(&mut modem, &clock, 2_000);
    assert_eq!(modem.state(), LifecycleState::WaitRegistration);
    let names: Vec<&str> = modem.operators().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["OpA", "OpC"]);
    assert_eq!(modem.candidate().unwrap().name.as_str(), "OpA");
    assert_eq!(modem.registration_checks_left(), 7);

    let sent = modem.driver_mut().sent();
    assert!(sent.contains(&"+COPS=2".to_string()));
    assert!(sent.contains(&"+CRSM=214,28539,0,0,12,\"FFFFFFFFFFFFFFFFFFFFFFFF\"".to_string()));
    assert!(sent.contains(&"+COPS=1,2,\"001\",7".to_string()));
    assert!(!sent.iter().any(|c| c.contains("\"002\"")));

    // OpA never registers: seven more checks, then OpC
    for _ in 0..6 {
        tick(&mut modem, &clock, 2_000);
        assert_eq!(modem.candidate().unwrap().name.as_str(), "OpA");
    }
    tick(&mut modem, &clock, 2_000);
    assert_eq!(modem.candidate().unwrap().name.as_str(), "OpC");
    assert_eq!(modem.registration_checks_left(), 7);

    tick(&mut modem, &clock, 2_000);
    assert_eq!(modem.state(), LifecycleState::AcquiringFix);
}

#[test]
fn test_registration_counter_decrements_once_per_interval() {
    let mut driver = MockDriver::default();
    driver.registered = false;
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.registration_checks_left(), 6);
    let polls = modem.driver().registration_polls;

    tick(&mut modem, &clock, 1_000);
    tick(&mut modem, &clock, 999);
    assert_eq!(modem.registration_checks_left(), 6);
    assert_eq!(modem.driver().registration_polls, polls);

    tick(&mut modem, &clock, 1);
    assert_eq!(modem.registration_checks_left(), 5);
    assert_eq!(modem.driver().registration_polls, polls + 1);
}

#[test]
fn test_failing_network_keeps_trying() {
    let mut driver = MockDriver::default();
    driver.registered = false;
    driver.accepts = vec!["001"];
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    let mut last_polls = 0;
    for round in 0..20 {
        for _ in 0..10 {
            tick(&mut modem, &clock, 2_000);
            assert!(matches!(
                modem.state(),
                LifecycleState::WaitRegistration | LifecycleState::Searching
            ));
        }
        let polls = modem.driver().registration_polls;
        assert!(polls > last_polls, "stalled in round {}", round);
        last_polls = polls;
    }
    assert!(modem.driver().scans > 1);
}

#[test]
fn test_no_acceptable_operator_rescans() {
    let mut driver = MockDriver::default();
    driver.registered = false;
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    for _ in 0..6 {
        tick(&mut modem, &clock, 2_000);
    }
    assert_eq!(modem.state(), LifecycleState::Searching);
    assert!(modem.candidate().is_none());
    assert_eq!(modem.driver().scans, 1);

    modem.step();
    assert_eq!(modem.driver().scans, 2);
    assert_eq!(modem.state(), LifecycleState::Searching);
}

#[test]
fn test_gps_timeout_still_connects() {
    let mut driver = MockDriver::default();
    driver.gps_fix = None;
    let (modem, clock) = modem(driver);
    let (states, observer) = recorder();
    let mut modem = modem.with_observer(observer);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::AcquiringFix);
    assert_eq!(modem.gps_state(), GpsFixState::Syncing);

    for _ in 0..17 {
        clock.advance_ms(5_000);
        modem.step();
        assert_eq!(modem.state(), LifecycleState::AcquiringFix);
    }

    clock.advance_ms(5_000);
    modem.step();
    assert_eq!(modem.gps_state(), GpsFixState::Timeout);
    assert_eq!(modem.state(), LifecycleState::Ready);
    assert!(states.borrow().contains(&LifecycleState::Connecting));
    assert!(modem.gps_fix().is_none());
}

#[test]
fn test_gps_timeout_is_configurable() {
    let mut driver = MockDriver::default();
    driver.gps_fix = None;
    let (mut modem, clock) = modem(driver);
    modem.set_gps_timeout(10);

    modem.begin().unwrap();
    modem.step();
    tick(&mut modem, &clock, 5_000);
    assert_eq!(modem.state(), LifecycleState::AcquiringFix);
    tick(&mut modem, &clock, 5_000);
    assert_eq!(modem.gps_state(), GpsFixState::Timeout);
}

#[test]
fn test_activation_failure_restarts_from_sim_init() {
    let mut driver = MockDriver::default();
    driver.bearer_ok = false;
    let (modem, _clock) = modem(driver);
    let (states, observer) = recorder();
    let mut modem = modem.with_observer(observer);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Starting);
    assert_eq!(modem.driver().pins.len(), 1);

    modem.driver_mut().bearer_ok = true;
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Ready);
    assert_eq!(modem.driver().pins.len(), 2);
    assert_eq!(
        *states.borrow(),
        vec![
            LifecycleState::Starting,
            LifecycleState::WaitRegistration,
            LifecycleState::AcquiringFix,
            LifecycleState::Connecting,
            LifecycleState::Starting,
            LifecycleState::WaitRegistration,
            LifecycleState::AcquiringFix,
            LifecycleState::Connecting,
            LifecycleState::Ready,
        ]
    );
}

#[test]
fn test_gps_sync_survives_restart() {
    let mut driver = MockDriver::default();
    driver.bearer_ok = false;
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Starting);
    assert_eq!(modem.gps_state(), GpsFixState::Synced);

    // The receiver loses its fix for longer than the timeout
    modem.driver_mut().gps_fix = None;
    modem.driver_mut().bearer_ok = true;
    modem.driver_mut().registered = false;
    modem.step();
    assert_eq!(modem.state(), LifecycleState::WaitRegistration);
    modem.driver_mut().registered = true;
    tick(&mut modem, &clock, 2_000);
    clock.advance_ms(120_000);
    modem.step();

    assert_eq!(modem.gps_state(), GpsFixState::Synced);
    assert_eq!(modem.state(), LifecycleState::Ready);
    assert_eq!(modem.gps_fix(), Some(&fix()));
}

#[test]
fn test_restart_keeps_clock_from_going_back() {
    let mut driver = MockDriver::default();
    driver.bearer_ok = false;
    let (mut modem, clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Starting);
    assert_eq!(modem.platform().time_sets, vec![FIX_UNIX]);

    // Fix lost and ten minutes pass before the next bring-up
    modem.driver_mut().gps_fix = None;
    clock.advance_ms(600_000);
    let before = modem.local_time();
    assert!(before.as_str() >= "2024-04-02 11:49:57 UTC");

    modem.step();

    // The held fix is stale and network time is not available yet
    assert_eq!(modem.gps_state(), GpsFixState::Synced);
    assert_eq!(modem.time_state(), TimeSyncState::Syncing);
    assert_eq!(modem.platform().time_sets, vec![FIX_UNIX]);
    assert!(modem.local_time().as_str() >= before.as_str());
}

#[test]
fn test_implausible_fix_is_ignored() {
    let mut driver = MockDriver::default();
    let mut bad = fix();
    bad.altitude = -17.0;
    driver.gps_fix = Some(bad);
    let (mut modem, _clock) = modem(driver);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::AcquiringFix);
    assert_eq!(modem.gps_state(), GpsFixState::Syncing);
}

#[test]
fn test_network_time_fallback() {
    let mut driver = MockDriver::default();
    driver.gps_fix = None;
    let (mut modem, clock) = modem(driver);
    modem
        .set_timezone("CET-1CEST,M3.5.0,M10.5.0/3")
        .unwrap();

    modem.begin().unwrap();
    modem.step();
    // Sentinel date: not synchronized
    assert_eq!(modem.time_state(), TimeSyncState::Syncing);
    assert!(modem.local_time().is_empty());

    modem.driver_mut().network_date = "24/04/02,13:39:57+08";
    modem.driver_mut().network_time = Some(NetworkTime {
        time: CalendarTime {
            year: 2024,
            month: 4,
            day: 2,
            hour: 13,
            minute: 39,
            second: 57,
        },
        tz_hours: 2.0,
    });
    tick(&mut modem, &clock, 5_000);

    assert_eq!(modem.time_state(), TimeSyncState::Synced);
    assert_eq!(modem.platform().system_time, Some(FIX_UNIX));
    assert_eq!(modem.local_time().as_str(), "2024-04-02 13:39:57 CEST");

    clock.advance_ms(3_000);
    assert_eq!(modem.local_time().as_str(), "2024-04-02 13:40:00 CEST");
}

#[test]
fn test_invalid_timezone_is_rejected() {
    let (mut modem, _clock) = modem(MockDriver::default());
    assert!(matches!(
        modem.set_timezone("not a zone!"),
        Err(Error::Timezone(_))
    ));
    assert_eq!(modem.config().timezone.as_str(), "UTC0");
}

#[test]
fn test_http_post_rejects_bad_arguments_without_io() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    modem.step();
    let before = modem.driver_mut().sent().len();

    assert_eq!(
        modem.http_post("ftp://x", b"{}", 30),
        Err(DataError::InvalidArgument)
    );
    assert_eq!(
        modem.http_post("https://example.com/hive", b"", 30),
        Err(DataError::InvalidArgument)
    );
    assert_eq!(
        modem.http_post("https:///hive", b"{}", 30),
        Err(DataError::InvalidArgument)
    );

    assert!(modem.driver().connects.is_empty());
    assert_eq!(modem.driver_mut().sent().len(), before);
}

#[test]
fn test_http_post_over_socket() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    modem.step();

    let status = modem.http_post("https://example.com/hive?id=7", br#"{"weight":42.5}"#, 30);
    assert_eq!(status, Ok(201));
    assert_eq!(
        modem.driver().connects,
        vec![("example.com".to_string(), 443, true, 30)]
    );
    assert!(modem.driver().socket_closed.get());

    let request = String::from_utf8(modem.driver().socket_tx.borrow().clone()).unwrap();
    assert!(request.starts_with("POST /hive?id=7 HTTP/1.1\r\n"));
    assert!(request.contains("Host: example.com\r\n"));
    assert!(request.contains("Content-Type: application/json\r\n"));
    assert!(request.contains("User-Agent: SIM7080\r\n"));
    assert!(request.ends_with("\r\n\r\n{\"weight\":42.5}"));
}

#[test]
fn test_http_post_maps_transport_failures() {
    let mut driver = MockDriver::default();
    driver.connect_error = Some(libmodem::network::error::Error::Timeout);
    let (mut modem, _clock) = modem(driver);
    assert_eq!(
        modem.http_post("http://example.com/", b"{}", 5),
        Err(DataError::Timeout)
    );

    modem.driver_mut().connect_error = Some(libmodem::network::error::Error::ConnectionRefused);
    assert_eq!(
        modem.http_post("http://example.com/", b"{}", 5),
        Err(DataError::ConnectionFailed)
    );

    modem.driver_mut().connect_error = None;
    modem.driver_mut().http_response = b"garbage\r\n\r\n";
    assert_eq!(
        modem.http_post("http://example.com/", b"{}", 5),
        Err(DataError::InvalidResponse)
    );

    modem.driver_mut().registered = false;
    assert_eq!(
        modem.http_post("http://example.com/", b"{}", 5),
        Err(DataError::ConnectionFailed)
    );
}

#[test]
fn test_http_post_through_native_client() {
    let (mut modem, _clock) = modem_with(MockDriver::default(), Config::default(), NativeHttps);
    modem.begin().unwrap();
    modem.step();

    assert_eq!(
        modem.http_post("https://example.com/hive", b"{}", 15),
        Ok(200)
    );
    assert_eq!(
        modem.driver().https_calls,
        vec![
            "begin",
            "url https://example.com/hive",
            "timeout 15",
            "user-agent SIM7080",
            "content-type application/json",
            "post 2",
            "end",
        ]
    );

    modem.driver_mut().https_calls.clear();
    modem.driver_mut().https_url_ok = false;
    assert_eq!(
        modem.http_post("https://example.com/hive", b"{}", 15),
        Err(DataError::InvalidArgument)
    );
    assert_eq!(
        modem.driver().https_calls,
        vec!["begin", "url https://example.com/hive", "end"]
    );
}

#[test]
fn test_send_tcp() {
    let (mut modem, _clock) = modem(MockDriver::default());
    assert_eq!(modem.send_tcp("collector.local", 9000, b"hello", 10), Ok(()));
    assert_eq!(
        modem.driver().connects,
        vec![("collector.local".to_string(), 9000, false, 10)]
    );
    assert_eq!(*modem.driver().socket_tx.borrow(), b"hello".to_vec());
    assert!(modem.driver().socket_closed.get());

    modem.driver_mut().connect_error = Some(libmodem::network::error::Error::ConnectionRefused);
    assert_eq!(
        modem.send_tcp("collector.local", 9000, b"hello", 10),
        Err(DataError::Timeout)
    );
}

#[test]
fn test_queued_at_commands() {
    let (mut modem, clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    modem.step();
    assert!(modem.is_ready());
    let start = clock.now_ms();
    let sent_before = modem.driver_mut().sent().len();

    modem.enqueue_at("  ATI ").unwrap();
    modem.enqueue_at("at+csq").unwrap();
    assert_eq!(modem.pending_commands(), 2);

    // Reply arrives: 5 s settle delay, then drained
    modem.driver_mut().next_reply = Some(b"SIMCOM_SIM7080G\r\nOK\r\n".to_vec());
    modem.step();
    assert_eq!(modem.pending_commands(), 1);
    assert_eq!(clock.now_ms(), start + 5_000);
    assert!(modem.driver().uart().rx.is_empty());

    // No reply: settle delay plus the full 10 s activity wait
    modem.step();
    assert_eq!(clock.now_ms(), start + 5_000 + 15_000);
    let sent = modem.driver_mut().sent();
    assert_eq!(sent[sent_before..].to_vec(), vec!["I", "+csq"]);
}

#[test]
fn test_queued_commands_wait_for_power() {
    let (mut modem, clock) = modem(MockDriver::default());
    modem.enqueue_at("+CSQ").unwrap();

    modem.step();
    assert_eq!(modem.pending_commands(), 1);
    assert_eq!(clock.now_ms(), 0);
    assert!(modem.driver_mut().sent().is_empty());

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.pending_commands(), 0);
    assert_eq!(modem.driver_mut().sent().last().map(String::as_str), Some("+CSQ"));
}

#[test]
fn test_at_queue_limits() {
    let (mut modem, _clock) = modem(MockDriver::default());
    for _ in 0..libmodem::modem::AT_QUEUE_LEN {
        modem.enqueue_at("+CSQ").unwrap();
    }
    assert_eq!(modem.enqueue_at("+CSQ"), Err(Error::QueueFull));

    let (mut modem, _clock) = common::modem(MockDriver::default());
    let long = "A".repeat(libmodem::modem::AT_COMMAND_LEN + 1);
    assert_eq!(modem.enqueue_at(&long), Err(Error::CommandTooLong));
}

#[test]
fn test_power_off_waits_for_modem() {
    let mut driver = MockDriver::default();
    driver.alive_checks = 3;
    let (modem, clock) = modem(driver);
    let (states, observer) = recorder();
    let mut modem = modem.with_observer(observer);

    modem.begin().unwrap();
    modem.step();
    let before = clock.now_ms();

    modem.power_off();
    assert_eq!(modem.state(), LifecycleState::Off);
    assert!(modem.driver().powered_off);
    assert_eq!(clock.now_ms() - before, 3 * 500);
    assert_eq!(modem.driver().uart().baud_rate, None);
    assert!(!modem.platform().power.is_high());
    assert!(modem.candidate().is_none());
    assert_eq!(states.borrow().last(), Some(&LifecycleState::Off));

    // Off is idle
    let sent = modem.driver_mut().sent().len();
    tick_any(&mut modem, &clock);
    assert_eq!(modem.driver_mut().sent().len(), sent);
}

fn tick_any<O: libmodem::modem::StateObserver>(
    modem: &mut libmodem::modem::Modem<
        MockDriver,
        MockPlatform,
        libmodem::gps::IntegratedGps,
        SocketHttp,
        O,
    >,
    clock: &Clock,
) {
    clock.advance_ms(60_000);
    modem.step();
}

#[test]
fn test_power_off_gives_up_on_stuck_modem() {
    let mut driver = MockDriver::default();
    driver.alive_checks = 1_000;
    let (mut modem, clock) = modem(driver);
    modem.begin().unwrap();
    let before = clock.now_ms();
    modem.power_off();
    // `AT` timeouts are spent in the driver; only the pauses move this clock
    assert_eq!(clock.now_ms() - before, 60 * 500);
    assert_eq!(modem.state(), LifecycleState::Off);
}

#[test]
fn test_forced_scan() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.scan_for_operators();
    assert_eq!(modem.state(), LifecycleState::Off);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Ready);
    modem.scan_for_operators();
    assert_eq!(modem.state(), LifecycleState::Searching);
}

#[test]
fn test_status_json() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    modem.step();

    let mut buf = [0u8; 1024];
    let len = modem.status_json(&mut buf).unwrap();
    let json = core::str::from_utf8(&buf[..len]).unwrap();
    assert!(json.starts_with("{\"state\":\"Ready\""));
    assert!(json.contains("\"gps_state\":\"Synced\""));
    assert!(json.contains("\"local_time\":\"2024-04-02 11:39:57 UTC\""));
    assert!(json.contains("\"imei\":\"869951030000000\""));
    assert!(json.contains("\"candidate\":null"));

    let mut small = [0u8; 16];
    assert_eq!(modem.status_json(&mut small), Err(Error::ValueTooLong));
}

#[test]
fn test_settings() {
    let (mut modem, _clock) = modem(MockDriver::default());
    modem.set_apn("internet").unwrap();
    modem.set_pin("1234").unwrap();
    modem.set_preferred_mode(PreferredMode::LteM);
    modem.set_bands(PreferredMode::LteM, "3,20").unwrap();
    assert_eq!(modem.bands(PreferredMode::LteM), "3,20");
    assert_eq!(modem.bands(PreferredMode::Auto), "");
    assert_eq!(modem.set_pin("123456789"), Err(Error::ValueTooLong));

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.driver().pins, vec![Some("1234".to_string())]);
    let sent = modem.driver_mut().sent();
    assert!(sent.contains(&"+CBANDCFG=\"CAT-M\",3,20".to_string()));
    assert!(sent.contains(&"+CGDCONT=1,\"IP\",\"internet\"".to_string()));
    assert!(sent.contains(&"+CMNB=1".to_string()));
}

#[test]
fn test_a7670_uses_gprs_attach() {
    let mut config = Config::default();
    config.profile = libmodem::modem::ModemProfile::A7670;
    config.apn = "iot".try_into().unwrap();
    let (mut modem, _clock) = modem_with(MockDriver::default(), config, SocketHttp);

    modem.begin().unwrap();
    modem.step();
    assert_eq!(modem.state(), LifecycleState::Ready);
    assert_eq!(modem.driver().gprs_attaches, vec!["iot".to_string()]);
    let sent = modem.driver_mut().sent();
    assert!(!sent.iter().any(|c| c.starts_with("+CNMP") || c.starts_with("+CNACT")));
}

#[test]
fn test_transcript_sink_sees_commands() {
    use std::sync::Mutex;
    static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
    fn sink(line: &str) {
        LINES.lock().unwrap().push(line.to_string());
    }

    let (mut modem, _clock) = modem(MockDriver::default());
    modem.begin().unwrap();
    modem.step();
    modem.set_debug(true);
    modem.set_transcript_sink(Some(sink));
    modem.enqueue_at("+CSQ").unwrap();
    modem.driver_mut().next_reply = Some(b"+CSQ: 20,99\r\nOK\r\n".to_vec());
    modem.step();

    let lines = LINES.lock().unwrap();
    assert!(lines.contains(&">> AT+CSQ".to_string()));
    assert!(lines.contains(&"<< +CSQ: 20,99".to_string()));
    assert!(lines.contains(&"<< OK".to_string()));
}
