//! DICOM value representations and their de-identification category

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DICOM value representation (VR) code
///
/// The full closed set from PS3.5 section 6.2. Parsing is case-sensitive,
/// matching the two-letter codes as they appear in DICOM JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
}

/// Semantic category of a metadata field, as far as PHI handling goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    /// Person name: replaced wholesale, never scanned
    PersonName,
    /// Short free text (LO, SH, UC)
    ShortText,
    /// Long free text (ST, LT, UT)
    LongText,
    /// Binary payload that commonly carries text (OW)
    BinaryText,
    /// Everything else: numbers, UIDs, codes, structured dates, pixel data
    Other,
}

impl Vr {
    /// Category used by the field dispatcher
    pub fn category(self) -> FieldCategory {
        match self {
            Vr::PN => FieldCategory::PersonName,
            Vr::LO | Vr::SH | Vr::UC => FieldCategory::ShortText,
            Vr::ST | Vr::LT | Vr::UT => FieldCategory::LongText,
            Vr::OW => FieldCategory::BinaryText,
            Vr::AE
            | Vr::AS
            | Vr::AT
            | Vr::CS
            | Vr::DA
            | Vr::DS
            | Vr::DT
            | Vr::FD
            | Vr::FL
            | Vr::IS
            | Vr::OB
            | Vr::OD
            | Vr::OF
            | Vr::OL
            | Vr::OV
            | Vr::SL
            | Vr::SQ
            | Vr::SS
            | Vr::SV
            | Vr::TM
            | Vr::UI
            | Vr::UL
            | Vr::UN
            | Vr::UR
            | Vr::US
            | Vr::UV => FieldCategory::Other,
        }
    }

    /// Two-letter code
    pub fn as_str(self) -> &'static str {
        match self {
            Vr::AE => "AE",
            Vr::AS => "AS",
            Vr::AT => "AT",
            Vr::CS => "CS",
            Vr::DA => "DA",
            Vr::DS => "DS",
            Vr::DT => "DT",
            Vr::FD => "FD",
            Vr::FL => "FL",
            Vr::IS => "IS",
            Vr::LO => "LO",
            Vr::LT => "LT",
            Vr::OB => "OB",
            Vr::OD => "OD",
            Vr::OF => "OF",
            Vr::OL => "OL",
            Vr::OV => "OV",
            Vr::OW => "OW",
            Vr::PN => "PN",
            Vr::SH => "SH",
            Vr::SL => "SL",
            Vr::SQ => "SQ",
            Vr::SS => "SS",
            Vr::ST => "ST",
            Vr::SV => "SV",
            Vr::TM => "TM",
            Vr::UC => "UC",
            Vr::UI => "UI",
            Vr::UL => "UL",
            Vr::UN => "UN",
            Vr::UR => "UR",
            Vr::US => "US",
            Vr::UT => "UT",
            Vr::UV => "UV",
        }
    }
}

impl FromStr for Vr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vr = match s {
            "AE" => Vr::AE,
            "AS" => Vr::AS,
            "AT" => Vr::AT,
            "CS" => Vr::CS,
            "DA" => Vr::DA,
            "DS" => Vr::DS,
            "DT" => Vr::DT,
            "FD" => Vr::FD,
            "FL" => Vr::FL,
            "IS" => Vr::IS,
            "LO" => Vr::LO,
            "LT" => Vr::LT,
            "OB" => Vr::OB,
            "OD" => Vr::OD,
            "OF" => Vr::OF,
            "OL" => Vr::OL,
            "OV" => Vr::OV,
            "OW" => Vr::OW,
            "PN" => Vr::PN,
            "SH" => Vr::SH,
            "SL" => Vr::SL,
            "SQ" => Vr::SQ,
            "SS" => Vr::SS,
            "ST" => Vr::ST,
            "SV" => Vr::SV,
            "TM" => Vr::TM,
            "UC" => Vr::UC,
            "UI" => Vr::UI,
            "UL" => Vr::UL,
            "UN" => Vr::UN,
            "UR" => Vr::UR,
            "US" => Vr::US,
            "UT" => Vr::UT,
            "UV" => Vr::UV,
            other => return Err(format!("Unknown value representation: {other}")),
        };
        Ok(vr)
    }
}

impl TryFrom<String> for Vr {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Vr> for String {
    fn from(vr: Vr) -> Self {
        vr.as_str().to_string()
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Vr::PN, FieldCategory::PersonName)]
    #[test_case(Vr::LO, FieldCategory::ShortText)]
    #[test_case(Vr::SH, FieldCategory::ShortText)]
    #[test_case(Vr::UC, FieldCategory::ShortText)]
    #[test_case(Vr::ST, FieldCategory::LongText)]
    #[test_case(Vr::LT, FieldCategory::LongText)]
    #[test_case(Vr::UT, FieldCategory::LongText)]
    #[test_case(Vr::OW, FieldCategory::BinaryText)]
    #[test_case(Vr::DA, FieldCategory::Other)]
    #[test_case(Vr::UI, FieldCategory::Other)]
    #[test_case(Vr::US, FieldCategory::Other)]
    #[test_case(Vr::OB, FieldCategory::Other)]
    fn test_vr_category(vr: Vr, expected: FieldCategory) {
        assert_eq!(vr.category(), expected);
    }

    #[test]
    fn test_vr_parse_roundtrip() {
        for code in ["PN", "LO", "OW", "UV", "SQ"] {
            let vr: Vr = code.parse().unwrap();
            assert_eq!(vr.as_str(), code);
        }
    }

    #[test]
    fn test_vr_parse_rejects_unknown() {
        assert!("XX".parse::<Vr>().is_err());
        assert!("pn".parse::<Vr>().is_err());
    }

    #[test]
    fn test_vr_serde_as_code() {
        let json = serde_json::to_string(&Vr::PN).unwrap();
        assert_eq!(json, "\"PN\"");
        let vr: Vr = serde_json::from_str("\"LT\"").unwrap();
        assert_eq!(vr, Vr::LT);
    }
}
