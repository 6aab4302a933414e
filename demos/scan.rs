/**
 * Scanner Example (Streaming)
 *
 * This example demonstrates how to use the streaming scanner to find
 * Broadlink devices on the local network in real-time using a standard
 * iterator (Receiver).
 */
use rustlink::Scanner;
use std::time::Duration;

fn main() {
    env_logger::init();
    println!("--- Rustlink - Scanner ---");
    println!("[INFO] Scanning the network for Broadlink devices in real-time...");

    // The Receiver acts as a blocking iterator and disconnects
    // when the scan times out.
    let stream = Scanner::new()
        .with_timeout(Duration::from_secs(10))
        .scan_stream();

    let mut count = 0;
    for device in stream {
        count += 1;
        println!("[{count}] Found: {device}");
    }

    println!("[INFO] Scan finished. Total devices found: {count}");
}
