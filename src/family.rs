//! Device-family dispatch: maps 16-bit device-type codes to the command
//! dialect the device speaks, with model and manufacturer names.

/// Coarse capability grouping selecting a command-payload dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Universal remotes (RM pro/mini/plus) and their sensors
    Rm,
    /// RM4 generation remotes; same dialect behind a two-byte prefix
    Rm4,
    /// First-generation smart plug
    Sp1,
    /// SP2/SP3/SP4 smart plugs
    Sp2,
    /// Four-socket power strip
    Mp1,
    /// Environment sensor
    A1,
    /// Light bulbs
    Lb,
    /// S3 hub with addressable sub-devices. No type code maps here; the
    /// builder selects it explicitly.
    Hub,
    /// Hysen-family heating thermostat
    Hysen,
    /// Dooya curtain motor
    Dooya,
    /// No known dialect; key exchange still works
    Unsupported,
}

impl Family {
    /// Short tag used in log lines and display output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Family::Rm => "RM",
            Family::Rm4 => "RM4",
            Family::Sp1 => "SP1",
            Family::Sp2 => "SP2",
            Family::Mp1 => "MP1",
            Family::A1 => "A1",
            Family::Lb => "LB",
            Family::Hub => "HUB",
            Family::Hysen => "HYS",
            Family::Dooya => "DOOYA",
            Family::Unsupported => "Unknown",
        }
    }

    /// Whether the device speaks the remote/learning dialect.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Family::Rm | Family::Rm4)
    }
}

/// Family tag plus model and manufacturer strings for one device type.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub family: Family,
    pub model: &'static str,
    pub manufacturer: &'static str,
}

define_device_table! {
    0x0000 => (Sp1, "SP1", "Broadlink"),
    0x2711 => (Sp2, "SP2", "Broadlink"),
    0x2716 => (Sp2, "NEO PRO", "Ankuoo"),
    0x2717 => (Sp2, "NEO", "Ankuoo"),
    0x2719 => (Sp2, "SP2-compatible", "Honeywell"),
    0x271A => (Sp2, "SP2-compatible", "Honeywell"),
    0x271D => (Sp2, "Ego", "Efergy"),
    0x2720 => (Sp2, "SP mini", "Broadlink"),
    0x2728 => (Sp2, "SP2-compatible", "URANT"),
    0x2733 => (Sp2, "SP3", "Broadlink"),
    0x2736 => (Sp2, "SP mini+", "Broadlink"),
    0x273E => (Sp2, "SP mini", "Broadlink"),
    0x7530 => (Sp2, "SP2", "Broadlink (OEM)"),
    0x7539 => (Sp2, "SP2-IL", "Broadlink (OEM)"),
    0x753E => (Sp2, "SP mini 3", "Broadlink"),
    0x7540 => (Sp2, "MP2", "Broadlink"),
    0x7544 => (Sp2, "SP2-CL", "Broadlink"),
    0x7546 => (Sp2, "SP2-UK/BR/IN", "Broadlink (OEM)"),
    0x7547 => (Sp2, "SC1", "Broadlink"),
    0x7918 => (Sp2, "SP2", "Broadlink (OEM)"),
    0x7919 => (Sp2, "SP2-compatible", "Honeywell"),
    0x791A => (Sp2, "SP2-compatible", "Honeywell"),
    0x7D00 => (Sp2, "SP3-EU", "Broadlink (OEM)"),
    0x7D0D => (Sp2, "SP mini 3", "Broadlink (OEM)"),
    0x9479 => (Sp2, "SP3S-US", "Broadlink"),
    0x947A => (Sp2, "SP3S-EU", "Broadlink"),
    0x5115 => (Sp2, "SCB1E", "Broadlink"),
    0x51E2 => (Sp2, "AHC/U-01", "BG Electrical"),
    0x6111 => (Sp2, "MCB1", "Broadlink"),
    0x6113 => (Sp2, "SCB1E", "Broadlink"),
    0x618B => (Sp2, "SP4L-EU", "Broadlink"),
    0x6489 => (Sp2, "SP4L-AU", "Broadlink"),
    0x648B => (Sp2, "SP4M-US", "Broadlink"),
    0x756C => (Sp2, "SP4M", "Broadlink"),
    0x756F => (Sp2, "MCB1", "Broadlink"),
    0x7579 => (Sp2, "SP4L-EU", "Broadlink"),
    0x7583 => (Sp2, "SP mini 3", "Broadlink"),
    0x7D11 => (Sp2, "SP mini 3", "Broadlink"),
    0xA56A => (Sp2, "MCB1", "Broadlink"),
    0xA589 => (Sp2, "SP4L-UK", "Broadlink"),
    0x2712 => (Rm, "RM pro/pro+", "Broadlink"),
    0x272A => (Rm, "RM pro", "Broadlink"),
    0x2737 => (Rm, "RM mini 3", "Broadlink"),
    0x273D => (Rm, "RM pro", "Broadlink"),
    0x277C => (Rm, "RM home", "Broadlink"),
    0x2783 => (Rm, "RM home", "Broadlink"),
    0x2787 => (Rm, "RM pro", "Broadlink"),
    0x278B => (Rm, "RM plus", "Broadlink"),
    0x278F => (Rm, "RM mini", "Broadlink"),
    0x2797 => (Rm, "RM pro+", "Broadlink"),
    0x279D => (Rm, "RM pro+", "Broadlink"),
    0x27A1 => (Rm, "RM plus", "Broadlink"),
    0x27A6 => (Rm, "RM plus", "Broadlink"),
    0x27A9 => (Rm, "RM pro+", "Broadlink"),
    0x27C2 => (Rm, "RM mini 3", "Broadlink"),
    0x27C3 => (Rm, "RM pro+", "Broadlink"),
    0x27C7 => (Rm, "RM mini 3", "Broadlink"),
    0x27CC => (Rm, "RM mini 3", "Broadlink"),
    0x27CD => (Rm, "RM mini 3", "Broadlink"),
    0x27D0 => (Rm, "RM mini 3", "Broadlink"),
    0x27D1 => (Rm, "RM mini 3", "Broadlink"),
    0x27D3 => (Rm, "RM mini 3", "Broadlink"),
    0x27DE => (Rm, "RM mini 3", "Broadlink"),
    0x5F36 => (Rm, "RM mini 3", "Broadlink"),
    0x6508 => (Rm, "RM mini 3", "Broadlink"),
    0x51DA => (Rm4, "RM4 mini", "Broadlink"),
    0x6026 => (Rm4, "RM4 pro", "Broadlink"),
    0x6070 => (Rm4, "RM4C mini", "Broadlink"),
    0x610E => (Rm4, "RM4 mini", "Broadlink"),
    0x610F => (Rm4, "RM4C mini", "Broadlink"),
    0x61A2 => (Rm4, "RM4 pro", "Broadlink"),
    0x62BC => (Rm4, "RM4 mini", "Broadlink"),
    0x62BE => (Rm4, "RM4C mini", "Broadlink"),
    0x6364 => (Rm4, "RM4S", "Broadlink"),
    0x648D => (Rm4, "RM4 mini", "Broadlink"),
    0x649B => (Rm4, "RM4 pro", "Broadlink"),
    0x6539 => (Rm4, "RM4C mini", "Broadlink"),
    0x653A => (Rm4, "RM4 mini", "Broadlink"),
    0x653C => (Rm4, "RM4 pro", "Broadlink"),
    0x2714 => (A1, "e-Sensor", "Broadlink"),
    0x4EB5 => (Mp1, "MP1-1K4S", "Broadlink"),
    0x4EF7 => (Mp1, "MP1-1K4S", "Broadlink (OEM)"),
    0x4F1B => (Mp1, "MP1-1K3S2U", "Broadlink (OEM)"),
    0x4F65 => (Mp1, "MP1-1K3S2U", "Broadlink"),
    0x5043 => (Lb, "SB800TD", "Broadlink (OEM)"),
    0x504E => (Lb, "LB1", "Broadlink"),
    0x60C7 => (Lb, "LB1", "Broadlink"),
    0x60C8 => (Lb, "LB1", "Broadlink"),
    0x6112 => (Lb, "LB1", "Broadlink"),
    0xA4F4 => (Lb, "LB27 R1", "Broadlink"),
    0x4EAD => (Hysen, "HY02B05H", "Hysen"),
    0x4E4D => (Dooya, "DT360E-45/20", "Dooya"),
}
