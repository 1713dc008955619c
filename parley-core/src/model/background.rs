use serde::{Deserialize, Serialize};

/// Which virtual-background effect is active. `None` is broadcast
/// explicitly when an effect is turned off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BackgroundMode {
    #[default]
    None,
    Blur {
        /// Box-blur radius in pixels.
        radius: u8,
    },
    Image {
        /// Where the replacement image can be fetched from.
        url: String,
    },
}

impl BackgroundMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VbgSettings {
    #[serde(flatten)]
    pub mode: BackgroundMode,
}

impl VbgSettings {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn blur(radius: u8) -> Self {
        Self {
            mode: BackgroundMode::Blur { radius },
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            mode: BackgroundMode::Image { url: url.into() },
        }
    }
}
