//! SH1122-class controller opcodes and power-up sequence

/// Set Lower Column Address (low nibble in opcode)
pub const SET_LOW_COLUMN_ADDR: u8 = 0x00;
/// Set Higher Column Address (high nibble in opcode)
pub const SET_HIGH_COLUMN_ADDR: u8 = 0x10;
/// Set Discharge VSL Level (level in low bits)
pub const SET_DISCHARGE_VSL_LEVEL: u8 = 0x30;
/// Set Display Start Line (line in low bits)
pub const SET_DISPLAY_START_LINE: u8 = 0x40;
/// Set Contrast Current (one payload byte)
pub const SET_CONTRAST_CURRENT: u8 = 0x81;
/// Set Segment Re-map (direction in bit 0)
pub const SET_SEGMENT_REMAP: u8 = 0xA0;
/// Entire Display Off/On (force-on in bit 0)
pub const SET_DISPLAY_OFF_ON: u8 = 0xA4;
/// Set Normal Display (bits interpreted normally)
pub const SET_NORMAL_DISPLAY: u8 = 0xA6;
/// Set Multiplex Ratio (one payload byte)
pub const SET_MULTIPLEX_RATIO: u8 = 0xA8;
/// DC-DC Control Mode Set
pub const SET_DCDC_SETTING: u8 = 0xAD;
/// DC-DC disable (follows `SET_DCDC_SETTING`)
pub const SET_DCDC_DISABLE: u8 = 0x80;
/// Display Off
pub const SET_DISPLAY_OFF: u8 = 0xAE;
/// Display On
pub const SET_DISPLAY_ON: u8 = 0xAF;
/// Set Row Address (one payload byte)
pub const SET_ROW_ADDR: u8 = 0xB0;
/// Set Scan Direction (direction in bit 3)
pub const SET_SCAN_DIRECTION: u8 = 0xC0;
/// Set Display Offset (one payload byte)
pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
/// Set Display Clock Divide Ratio / Oscillator Frequency (one payload byte)
pub const SET_CLOCK_DIVIDER: u8 = 0xD5;
/// Set Discharge/Precharge Period (one payload byte)
pub const SET_DISCHARGE_PRECHARGE_PERIOD: u8 = 0xD9;
/// Set VCOM Deselect Level (one payload byte)
pub const SET_VCOM_DESELECT_LEVEL: u8 = 0xDB;
/// Set VSEGM Level (one payload byte)
pub const SET_VSEGM_LEVEL: u8 = 0xDC;

/// Milliseconds to wait after switching the panel on (datasheet figure)
pub const POWER_UP_SETTLE_MS: u32 = 100;

/// Power-up sequence, sent verbatim before any drawing call.
///
/// Contrast current, precharge voltage and VSL were tuned against the
/// production panel; the start line of 32 is what makes the flipped
/// mounting come out upright.
pub const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (SET_DISPLAY_OFF, &[]),
    (SET_ROW_ADDR, &[0x00]),
    (SET_HIGH_COLUMN_ADDR, &[]),
    (SET_LOW_COLUMN_ADDR, &[]),
    // Default fosc (512 kHz), divide ratio 1: 512/64/64/1 = 125 Hz frame rate
    (SET_CLOCK_DIVIDER, &[0x50]),
    (SET_DISCHARGE_PRECHARGE_PERIOD, &[0x22]),
    (SET_DISPLAY_START_LINE | 32, &[]),
    (SET_CONTRAST_CURRENT, &[0x80]),
    (SET_SEGMENT_REMAP | 0x01, &[]),
    (SET_SCAN_DIRECTION | 0x08, &[]),
    (SET_DISPLAY_OFF_ON, &[]),
    (SET_NORMAL_DISPLAY, &[]),
    (SET_MULTIPLEX_RATIO, &[0x3F]),
    (SET_DCDC_SETTING, &[]),
    (SET_DCDC_DISABLE, &[]),
    (SET_DISPLAY_OFFSET, &[0x00]),
    // VCOMH = (0.430 + A[7:0] x 0.006415) x VREF
    (SET_VCOM_DESELECT_LEVEL, &[0x30]),
    (SET_VSEGM_LEVEL, &[0x00]),
    (SET_DISCHARGE_VSL_LEVEL | 0x01, &[]),
];
