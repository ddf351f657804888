//! Property tests for device classes, status codes and config validation.

use proptest::prelude::*;
use vadd_common::config::MAX_LENGTH;
use vadd_common::{status_name, ClStatus, DeviceClass, VaddConfig};

fn device_class() -> impl Strategy<Value = DeviceClass> {
    prop::sample::select(DeviceClass::ALL)
}

proptest! {
    #[test]
    fn device_class_display_parses_back(class in device_class(), upper in any::<bool>(), pad in 0usize..3) {
        let mut text = class.to_string();
        if upper {
            text = text.to_ascii_uppercase();
        }
        let padded = format!("{}{text}{}", " ".repeat(pad), " ".repeat(pad));
        prop_assert_eq!(padded.parse::<DeviceClass>(), Ok(class));
    }

    #[test]
    fn every_status_code_has_a_name(code in any::<i32>()) {
        let name = status_name(code);
        prop_assert!(name.starts_with("CL_") || name == "UNKNOWN ERROR", "{}", name);
        let status = ClStatus::from(code);
        prop_assert_eq!(status.to_string(), format!("{name} ({code})"));
    }

    #[test]
    fn lengths_within_limit_validate(length in 1usize..=MAX_LENGTH) {
        let cfg = VaddConfig { length, ..VaddConfig::default() };
        prop_assert!(cfg.validate().is_ok());
    }

    #[test]
    fn lengths_over_limit_are_rejected(length in (MAX_LENGTH + 1)..=usize::MAX) {
        let cfg = VaddConfig { length, ..VaddConfig::default() };
        let err = cfg.validate().unwrap_err();
        prop_assert!(err.to_string().contains("length"));
    }
}
