//! Platform and device discovery.

use crate::runtime::ComputeRuntime;
use serde::Serialize;
use tracing::{debug, info, warn};
use vadd_common::{ClStatus, DeviceClass, Result, VaddError};

/// The device a run executes on, plus the platform list it came from.
///
/// Fields drop in declaration order: the device is released before the
/// platform list that produced it.
pub struct SelectedDevice<R: ComputeRuntime> {
    pub device: R::Device,
    pub name: String,
    pub platform_index: usize,
    pub platform_name: String,
    pub platforms: Vec<R::Platform>,
}

impl<R: ComputeRuntime> std::fmt::Debug for SelectedDevice<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedDevice")
            .field("name", &self.name)
            .field("platform_index", &self.platform_index)
            .field("platform_name", &self.platform_name)
            .field("platforms", &self.platforms.len())
            .finish()
    }
}

/// A device as reported by [`enumerate_devices`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceListing {
    pub platform_index: usize,
    pub platform: String,
    pub name: String,
    pub class: DeviceClass,
}

/// Enumerate platforms, mapping an empty set to [`VaddError::NoPlatform`].
fn list_platforms<R: ComputeRuntime>(runtime: &R) -> Result<Vec<R::Platform>> {
    match runtime.platforms() {
        Ok(platforms) if platforms.is_empty() => Err(VaddError::NoPlatform),
        Ok(platforms) => Ok(platforms),
        Err(ClStatus::PLATFORM_NOT_FOUND_KHR) => Err(VaddError::NoPlatform),
        Err(status) => Err(VaddError::PlatformQueryFailed { status }),
    }
}

/// Search platforms in order for a device of `class`.
///
/// The first platform that reports at least one matching device wins and
/// its first device is selected.
pub fn locate_device<R: ComputeRuntime>(runtime: &R, class: DeviceClass) -> Result<SelectedDevice<R>> {
    let platforms = list_platforms(runtime)?;
    debug!(runtime = runtime.name(), count = platforms.len(), "found platforms");

    let mut last_status = ClStatus::DEVICE_NOT_FOUND;
    let mut found = None;
    for (index, platform) in platforms.iter().enumerate() {
        let platform_name = runtime.platform_name(platform).unwrap_or_default();
        match runtime.devices(platform, class) {
            Ok(devices) if !devices.is_empty() => {
                if let Some(device) = devices.into_iter().next() {
                    found = Some((index, platform_name, device));
                    break;
                }
            }
            Ok(_) => debug!(platform = %platform_name, %class, "no matching devices"),
            Err(status) => {
                debug!(platform = %platform_name, %class, %status, "device query failed");
                last_status = status;
            }
        }
    }

    let Some((index, platform_name, device)) = found else {
        debug!(%class, status = %last_status, "no device found on any platform");
        return Err(VaddError::NoDevice { class, status: last_status });
    };

    let name = match runtime.device_name(&device) {
        Ok(name) => name,
        Err(status) => {
            warn!(%status, "could not query device name");
            String::from("unknown device")
        }
    };
    info!(device = %name, platform = %platform_name, platform_index = index, "selected device");

    Ok(SelectedDevice { device, name, platform_index: index, platform_name, platforms })
}

/// List every device on every platform, in platform order.
pub fn enumerate_devices<R: ComputeRuntime>(runtime: &R) -> Result<Vec<DeviceListing>> {
    let platforms = list_platforms(runtime)?;
    let mut listings = Vec::new();
    for (platform_index, platform) in platforms.iter().enumerate() {
        let platform_name = runtime.platform_name(platform).unwrap_or_default();
        let devices = match runtime.devices(platform, DeviceClass::All) {
            Ok(devices) => devices,
            Err(ClStatus::DEVICE_NOT_FOUND) => continue,
            Err(status) => return Err(VaddError::NoDevice { class: DeviceClass::All, status }),
        };
        for device in &devices {
            listings.push(DeviceListing {
                platform_index,
                platform: platform_name.clone(),
                name: runtime.device_name(device).unwrap_or_default(),
                class: runtime.device_class(device).unwrap_or_default(),
            });
        }
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{
        Fault, FaultStage, ReferenceDevice, ReferencePlatform, ReferenceRuntime, ResourceKind,
    };

    fn two_platforms() -> ReferenceRuntime {
        ReferenceRuntime::with_platforms(vec![
            ReferencePlatform::new("cpu-only")
                .with_device(ReferenceDevice::new("cpu0", DeviceClass::Cpu)),
            ReferencePlatform::new("gpus")
                .with_device(ReferenceDevice::new("gpu0", DeviceClass::Gpu))
                .with_device(ReferenceDevice::new("gpu1", DeviceClass::Gpu)),
        ])
    }

    #[test]
    fn default_picks_first_platform() {
        let rt = two_platforms();
        let selected = locate_device(&rt, DeviceClass::Default).unwrap();
        assert_eq!(selected.name, "cpu0");
        assert_eq!(selected.platform_name, "cpu-only");
        assert_eq!(selected.platforms.len(), 2);
    }

    #[test]
    fn class_search_moves_to_next_platform() {
        let rt = two_platforms();
        let selected = locate_device(&rt, DeviceClass::Gpu).unwrap();
        assert_eq!(selected.name, "gpu0");
        assert_eq!(selected.platform_name, "gpus");
        assert_eq!(selected.platform_index, 1);
    }

    #[test]
    fn no_match_reports_last_status() {
        let rt = two_platforms();
        match locate_device(&rt, DeviceClass::Accelerator) {
            Err(VaddError::NoDevice { class, status }) => {
                assert_eq!(class, DeviceClass::Accelerator);
                assert_eq!(status, ClStatus::DEVICE_NOT_FOUND);
            }
            other => panic!("expected NoDevice, got {other:?}"),
        }
        assert!(rt.ledger().is_clean());
    }

    #[test]
    fn empty_host_is_no_platform() {
        let rt = ReferenceRuntime::without_platforms();
        assert!(matches!(locate_device(&rt, DeviceClass::Default), Err(VaddError::NoPlatform)));
    }

    #[test]
    fn khr_not_found_is_no_platform() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::Platforms, ClStatus::PLATFORM_NOT_FOUND_KHR));
        assert!(matches!(locate_device(&rt, DeviceClass::Default), Err(VaddError::NoPlatform)));
    }

    #[test]
    fn other_platform_errors_propagate() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::Platforms, ClStatus::OUT_OF_HOST_MEMORY));
        assert!(matches!(
            locate_device(&rt, DeviceClass::Default),
            Err(VaddError::PlatformQueryFailed { status: ClStatus::OUT_OF_HOST_MEMORY })
        ));
    }

    #[test]
    fn selection_releases_device_before_platforms() {
        let rt = two_platforms();
        drop(locate_device(&rt, DeviceClass::Gpu).unwrap());
        let ledger = rt.ledger();
        assert!(ledger.is_clean());
        assert_eq!(ledger.released_kinds(), vec![ResourceKind::Device, ResourceKind::PlatformList]);
    }

    #[test]
    fn enumerate_lists_all_devices() {
        let rt = two_platforms();
        let listings = enumerate_devices(&rt).unwrap();
        let names: Vec<&str> = listings.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["cpu0", "gpu0", "gpu1"]);
        assert_eq!(listings[1].class, DeviceClass::Gpu);
        assert_eq!(listings[2].platform, "gpus");
    }
}
