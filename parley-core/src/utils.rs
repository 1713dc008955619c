pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Label of the single control data channel.
pub const CONTROL_CHANNEL_LABEL: &str = "parley-control";
