use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub board_name: &'static str,

    // 扬声器 (I2S 输出)
    pub speaker_device: &'static str,
    pub speaker_sample_rate: u32,
    pub speaker_channels: u32,
    /// 0 = let ALSA decide
    pub speaker_period_size: usize,
    /// Volume level (0-100) in effect until the host sends one
    pub default_volume: u32,
    pub default_muted: bool,

    // 麦克风 (PDM 输入)
    pub mic_enabled: bool,
    pub mic_device: &'static str,
    pub mic_sample_rate: u32,
    pub mic_channels: u32,

    // UAC gadget
    pub gadget_capture_device: &'static str,
    pub gadget_playback_device: &'static str,
    pub gadget_mixer_card: &'static str,
    pub gadget_mixer_control: &'static str,
    pub control_poll_ms: u64,
    pub i2s_settle_ms: u64,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),
            board_name: env!("BOARD_NAME"),

            speaker_device: env!("SPEAKER_DEVICE"),
            speaker_sample_rate: env!("SPEAKER_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse SPEAKER_SAMPLE_RATE")?,
            speaker_channels: env!("SPEAKER_CHANNELS").parse()
                .map_err(|_| "Failed to parse SPEAKER_CHANNELS")?,
            speaker_period_size: env!("SPEAKER_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse SPEAKER_PERIOD_SIZE")?,
            default_volume: env!("SPEAKER_DEFAULT_VOLUME").parse()
                .map_err(|_| "Failed to parse SPEAKER_DEFAULT_VOLUME")?,
            default_muted: env!("SPEAKER_DEFAULT_MUTED").parse()
                .map_err(|_| "Failed to parse SPEAKER_DEFAULT_MUTED")?,

            mic_enabled: env!("MIC_ENABLED").parse()
                .map_err(|_| "Failed to parse MIC_ENABLED")?,
            mic_device: env!("MIC_DEVICE"),
            mic_sample_rate: env!("MIC_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse MIC_SAMPLE_RATE")?,
            mic_channels: env!("MIC_CHANNELS").parse()
                .map_err(|_| "Failed to parse MIC_CHANNELS")?,

            gadget_capture_device: env!("GADGET_CAPTURE_DEVICE"),
            gadget_playback_device: env!("GADGET_PLAYBACK_DEVICE"),
            gadget_mixer_card: env!("GADGET_MIXER_CARD"),
            gadget_mixer_control: env!("GADGET_MIXER_CONTROL"),
            control_poll_ms: env!("GADGET_CONTROL_POLL_MS").parse()
                .map_err(|_| "Failed to parse GADGET_CONTROL_POLL_MS")?,
            i2s_settle_ms: env!("GADGET_I2S_SETTLE_MS").parse()
                .map_err(|_| "Failed to parse GADGET_I2S_SETTLE_MS")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
