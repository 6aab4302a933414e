/**
 * IR Learning Example
 *
 * Discovers the first remote on the network, captures an IR code and
 * immediately replays it.
 */
use rustlink::{Family, discover, learning};
use std::time::Duration;

fn main() -> rustlink::Result<()> {
    env_logger::init();

    let devices = discover(Duration::from_secs(5), None, None)?;
    let Some(remote) = devices
        .iter()
        .find(|d| matches!(d.family(), Family::Rm | Family::Rm4))
    else {
        println!("[WARN] No remote found on the network");
        return Ok(());
    };

    println!("[INFO] Using {remote}");
    remote.auth()?;

    println!("[INFO] Point your remote at the device and press a button...");
    let code = learning::learn_ir(remote, learning::DEFAULT_LEARN_TIMEOUT)?;
    println!("[INFO] Captured {} bytes: {}", code.len(), hex::encode(&code));

    println!("[INFO] Replaying the captured code...");
    remote.send_data(&code)?;
    Ok(())
}
