use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use uac_bridge::audio::alsa_device::{self, AlsaPcm};
use uac_bridge::audio::{GainControl, InputTransport, OutputTransport};
use uac_bridge::config::Config;
use uac_bridge::gadget::{ControlEvent, UacGadget};
use uac_bridge::uac::{StreamingEndpointBridge, UacCallbacks};

fn open_speaker(config: &Config) -> Option<AlsaPcm> {
    let period_size_opt = if config.speaker_period_size > 0 {
        Some(config.speaker_period_size)
    } else {
        None
    };
    match alsa_device::open_playback(
        config.speaker_device,
        config.speaker_sample_rate,
        config.speaker_channels,
        period_size_opt,
    ) {
        Ok(pcm) => Some(pcm),
        Err(e) => {
            log::error!("Speaker output unavailable: {:#}", e);
            None
        }
    }
}

fn open_microphone(config: &Config) -> Option<AlsaPcm> {
    if !config.mic_enabled {
        log::info!("Microphone interface disabled, input transport left closed");
        return None;
    }
    match alsa_device::open_capture(
        config.mic_device,
        config.mic_sample_rate,
        config.mic_channels,
        None,
    ) {
        Ok(pcm) => Some(pcm),
        Err(e) => {
            log::error!("Microphone input unavailable: {:#}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 加载配置
    let config = Config::new().unwrap_or_default();
    log::info!(
        "{} v{} on board {}",
        config.app_name,
        config.app_version,
        config.board_name
    );

    let gain = Arc::new(GainControl::new(config.default_volume, config.default_muted));

    // Transports are opened once here and never replaced while streaming
    let speaker = open_speaker(&config);
    let microphone = open_microphone(&config);

    // Wait for I2S to stabilize before the host can start streaming
    tokio::time::sleep(Duration::from_millis(config.i2s_settle_ms)).await;

    let bridge = Arc::new(StreamingEndpointBridge::new(
        gain.clone(),
        OutputTransport::new(speaker),
        InputTransport::new(microphone),
    ));
    log::info!(
        "Bridge ready: speaker={}, microphone={}, volume={}, muted={}",
        bridge.has_output(),
        bridge.has_input(),
        gain.volume(),
        gain.is_muted(),
    );

    let (control_tx, mut control_rx) = mpsc::channel::<ControlEvent>(16);
    let mut gadget = UacGadget::start(&config, bridge.clone(), control_tx)?;

    loop {
        tokio::select! {
            // 监听 Ctrl+C 信号
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down...");
                break;
            }

            // 监听主机的音量/静音请求
            Some(event) = control_rx.recv() => {
                match event {
                    ControlEvent::Mute(muted) => {
                        bridge.set_mute(muted);
                        log::info!("Host mute: {}", muted);
                    }
                    ControlEvent::Volume(level) => {
                        bridge.set_volume(level);
                        log::info!(
                            "Host volume: {} (factor {:.4})",
                            level,
                            gain.current_state().factor
                        );
                    }
                }
            }
        }
    }

    gadget.stop();
    Ok(())
}
