//! List platforms and devices

use anyhow::Result;
use clap::Args;
use console::style;
use serde_json::json;

use super::{OutputFormat, RuntimeKind};
use crate::exit::EXIT_SUCCESS;
use vadd_common::DeviceClass;
use vadd_opencl::{enumerate_devices, locate_device, ComputeRuntime, ReferenceRuntime};

/// Show every device, marking the one a run would use
#[derive(Debug, Clone, Default, Args)]
pub struct DevicesCommand {
    /// Compute runtime
    #[arg(long, value_enum, default_value_t = RuntimeKind::default())]
    pub runtime: RuntimeKind,

    /// Output format (text or json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,
}

impl DevicesCommand {
    pub fn execute(&self, class: DeviceClass) -> Result<i32> {
        match self.runtime {
            #[cfg(feature = "opencl")]
            RuntimeKind::Opencl => self.list(&vadd_opencl::OpenClRuntime::new(), class),
            RuntimeKind::Reference => self.list(&ReferenceRuntime::new(), class),
        }
    }

    fn list<R: ComputeRuntime>(&self, runtime: &R, class: DeviceClass) -> Result<i32> {
        let listings = enumerate_devices(runtime)?;
        let chosen = locate_device(runtime, class)
            .ok()
            .map(|selected| (selected.platform_index, selected.name.clone()));
        let is_chosen = |index: usize, name: &str| {
            chosen.as_ref().is_some_and(|(i, n)| *i == index && n == name)
        };

        match self.output_format {
            OutputFormat::Json => {
                let devices: Vec<_> = listings
                    .iter()
                    .map(|d| {
                        json!({
                            "platform_index": d.platform_index,
                            "platform": d.platform,
                            "name": d.name,
                            "class": d.class,
                            "selected": is_chosen(d.platform_index, &d.name),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "runtime": runtime.name(),
                        "requested": class,
                        "devices": devices,
                    }))?
                );
            }
            OutputFormat::Text => {
                let mut current = None;
                for device in &listings {
                    if current != Some(device.platform_index) {
                        println!(
                            "{} {}: {}",
                            style("Platform").bold(),
                            device.platform_index,
                            device.platform
                        );
                        current = Some(device.platform_index);
                    }
                    let marker = if is_chosen(device.platform_index, &device.name) {
                        style("*").green().bold().to_string()
                    } else {
                        " ".to_string()
                    };
                    println!("  {marker} {} [{}]", device.name, device.class);
                }
                if chosen.is_none() {
                    println!("No {class} device available");
                }
            }
        }
        Ok(EXIT_SUCCESS)
    }
}
