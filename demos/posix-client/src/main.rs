//! Periodic SNTP client over a POSIX-style UDP socket: resolve, request,
//! poll for the response, apply it, sleep for the recommended interval,
//! repeat.

use sntpc::{
    calculate_poll_interval, Context, Error, NoAuth, ServerInfo,
    PACKET_BASE_SIZE,
};
use sntpc_net_std::{StdClock, StdDnsResolver, StdUdpTransport};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SERVER_RESPONSE_TIMEOUT_MS: u64 = 3000;
const TIME_REQUEST_RECEIVE_WAIT_TIME_MS: u64 = 1000;
const SYSTEM_CLOCK_FREQUENCY_TOLERANCE_PPM: u32 = 500;
const SYSTEM_CLOCK_DESIRED_ACCURACY_MS: u32 = 300;

fn main() {
    #[cfg(feature = "log")]
    simple_logger::init_with_level(log::Level::Debug).unwrap();

    let servers = [
        ServerInfo::new("0.pool.ntp.org"),
        ServerInfo::new("1.pool.ntp.org"),
    ];
    let mut buffer = [0u8; PACKET_BASE_SIZE];
    let transport = StdUdpTransport::bind("0.0.0.0:0")
        .expect("unable to create UDP socket");

    let mut ctx = Context::new(
        &servers,
        &mut buffer,
        SERVER_RESPONSE_TIMEOUT_MS,
        StdDnsResolver,
        StdClock,
        StdClock,
        transport,
        NoAuth,
    )
    .expect("invalid client configuration");

    let poll_interval_sec = calculate_poll_interval(
        SYSTEM_CLOCK_FREQUENCY_TOLERANCE_PPM,
        SYSTEM_CLOCK_DESIRED_ACCURACY_MS,
    )
    .expect("poll interval parameters are in range");

    loop {
        if let Err(err) = ctx.send_time_request(pseudo_random()) {
            eprintln!("request send failed: {err}");
            thread::sleep(Duration::from_secs(u64::from(poll_interval_sec)));
            continue;
        }

        let result = loop {
            match ctx.receive_time_response(TIME_REQUEST_RECEIVE_WAIT_TIME_MS)
            {
                Err(Error::NoResponseReceived) => continue,
                other => break other,
            }
        };

        match result {
            Ok(outcome) => println!("synchronized: {outcome:?}"),
            Err(err) => eprintln!("request failed: {err}"),
        }

        thread::sleep(Duration::from_secs(u64::from(poll_interval_sec)));
    }
}

/// Not cryptographically secure; sufficient for mixing into the
/// replay-protection bits of an outgoing request.
fn pseudo_random() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos ^ nanos.rotate_left(13)
}
