use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn soundtrap_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_soundtrap").expect("soundtrap test binary not built")
}

#[test]
fn help_mentions_the_recorder() {
    let output = Command::new(soundtrap_bin())
        .arg("--help")
        .output()
        .expect("run soundtrap --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Voice-activated audio recorder"));
    assert!(combined.contains("--activation-db"));
    assert!(combined.contains("--min-silence-secs"));
}

#[test]
fn list_input_devices_prints_message() {
    let output = Command::new(soundtrap_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run soundtrap --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn bad_channel_capacity_is_rejected() {
    let output = Command::new(soundtrap_bin())
        .args(["--channel-capacity", "4"])
        .output()
        .expect("run soundtrap with bad capacity");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--channel-capacity"));
}
