use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    board: Board,
    speaker: Speaker,
    microphone: Microphone,
    gadget: Gadget,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Board {
    #[serde(rename = "type")]
    type_: String,
    name: String,
}

#[derive(Deserialize)]
struct Speaker {
    device: String,
    sample_rate: u32,
    channels: u32,
    period_size: usize,
    default_volume: u32,
    default_muted: bool,
}

#[derive(Deserialize)]
struct Microphone {
    enabled: bool,
    device: String,
    sample_rate: u32,
    channels: u32,
}

#[derive(Deserialize)]
struct Gadget {
    capture_device: String,
    playback_device: String,
    mixer_card: String,
    mixer_control: String,
    control_poll_ms: u64,
    i2s_settle_ms: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用和板子信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);
    println!("cargo:rustc-env=BOARD_TYPE={}", config.board.type_);
    println!("cargo:rustc-env=BOARD_NAME={}", config.board.name);

    // Speaker (I2S output)
    println!("cargo:rustc-env=SPEAKER_DEVICE={}", config.speaker.device);
    println!("cargo:rustc-env=SPEAKER_SAMPLE_RATE={}", config.speaker.sample_rate);
    println!("cargo:rustc-env=SPEAKER_CHANNELS={}", config.speaker.channels);
    println!("cargo:rustc-env=SPEAKER_PERIOD_SIZE={}", config.speaker.period_size);
    println!("cargo:rustc-env=SPEAKER_DEFAULT_VOLUME={}", config.speaker.default_volume);
    println!("cargo:rustc-env=SPEAKER_DEFAULT_MUTED={}", config.speaker.default_muted);

    // Microphone (PDM input)
    println!("cargo:rustc-env=MIC_ENABLED={}", config.microphone.enabled);
    println!("cargo:rustc-env=MIC_DEVICE={}", config.microphone.device);
    println!("cargo:rustc-env=MIC_SAMPLE_RATE={}", config.microphone.sample_rate);
    println!("cargo:rustc-env=MIC_CHANNELS={}", config.microphone.channels);

    // UAC gadget
    println!("cargo:rustc-env=GADGET_CAPTURE_DEVICE={}", config.gadget.capture_device);
    println!("cargo:rustc-env=GADGET_PLAYBACK_DEVICE={}", config.gadget.playback_device);
    println!("cargo:rustc-env=GADGET_MIXER_CARD={}", config.gadget.mixer_card);
    println!("cargo:rustc-env=GADGET_MIXER_CONTROL={}", config.gadget.mixer_control);
    println!("cargo:rustc-env=GADGET_CONTROL_POLL_MS={}", config.gadget.control_poll_ms);
    println!("cargo:rustc-env=GADGET_I2S_SETTLE_MS={}", config.gadget.i2s_settle_ms);
}
