//! Выбор вычислительного устройства

use super::api::ComputeApi;
use super::types::*;
use crate::error::DispatchError;

/// Устройство платформы вместе с его типом и именем
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: cl_device_id,
    pub device_type: cl_device_type,
    pub name: String,
}

impl DeviceDescriptor {
    pub fn is_gpu(&self) -> bool {
        self.device_type & CL_DEVICE_TYPE_GPU != 0
    }
}

/// Перечисляет устройства первой платформы
///
/// Поддерживается только первая платформа. Её отсутствие, как и ошибка
/// опроса устройств, означает, что видеокарты нет.
pub fn enumerate_first_platform(api: &dyn ComputeApi) -> Result<Vec<DeviceDescriptor>, DispatchError> {
    let platform = match api.platform_ids() {
        Ok(platforms) => match platforms.first() {
            Some(platform) => *platform,
            None => return Err(DispatchError::NoGpuDeviceFound),
        },
        Err(status) => {
            log::warn!("OpenCL platform query failed: {}", status);
            return Err(DispatchError::NoGpuDeviceFound);
        }
    };

    let devices = api.device_ids(platform).map_err(|status| {
        log::warn!("OpenCL device query failed: {}", status);
        DispatchError::NoGpuDeviceFound
    })?;

    let mut descriptors = Vec::with_capacity(devices.len());
    for id in devices {
        let device_type = match api.device_type(id) {
            Ok(device_type) => device_type,
            Err(status) => {
                log::warn!("Skipping device {:?}: type query failed: {}", id, status);
                continue;
            }
        };
        let name = api.device_name(id).unwrap_or_default();
        log::debug!("Found OpenCL device: {} (GPU: {})", name, device_type & CL_DEVICE_TYPE_GPU != 0);
        descriptors.push(DeviceDescriptor { id, device_type, name });
    }
    Ok(descriptors)
}

/// Первая видеокарта в списке; откат на процессор не выполняется
pub fn select_gpu_device(devices: &[DeviceDescriptor]) -> Result<&DeviceDescriptor, DispatchError> {
    devices
        .iter()
        .find(|device| device.is_gpu())
        .ok_or(DispatchError::NoGpuDeviceFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opencl::emulator::{EmulatedDevice, EmulatedOpenCl, FailurePoint};

    fn descriptor(id: usize, device_type: cl_device_type, name: &str) -> DeviceDescriptor {
        DeviceDescriptor { id: id as cl_device_id, device_type, name: name.to_string() }
    }

    #[test]
    fn picks_first_gpu() {
        let devices = vec![
            descriptor(1, CL_DEVICE_TYPE_CPU, "cpu"),
            descriptor(2, CL_DEVICE_TYPE_GPU, "first gpu"),
            descriptor(3, CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_DEFAULT, "second gpu"),
        ];
        assert_eq!(select_gpu_device(&devices).unwrap().name, "first gpu");
    }

    #[test]
    fn no_cpu_fallback() {
        let devices = vec![
            descriptor(1, CL_DEVICE_TYPE_CPU, "cpu"),
            descriptor(2, CL_DEVICE_TYPE_ACCELERATOR, "accelerator"),
        ];
        assert!(matches!(select_gpu_device(&devices), Err(DispatchError::NoGpuDeviceFound)));
        assert!(matches!(select_gpu_device(&[]), Err(DispatchError::NoGpuDeviceFound)));
    }

    #[test]
    fn combined_type_counts_as_gpu() {
        let devices = vec![
            descriptor(1, CL_DEVICE_TYPE_CPU | CL_DEVICE_TYPE_DEFAULT, "default cpu"),
            descriptor(2, CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_DEFAULT, "default gpu"),
        ];
        assert!(!devices[0].is_gpu());
        assert!(devices[1].is_gpu());
        assert_eq!(select_gpu_device(&devices).unwrap().name, "default gpu");
    }

    #[test]
    fn enumerates_emulated_platform() {
        let api = EmulatedOpenCl::with_devices(vec![
            EmulatedDevice::cpu("host"),
            EmulatedDevice::gpu("card"),
        ]);
        let devices = enumerate_first_platform(&api).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(select_gpu_device(&devices).unwrap().name, "card");
    }

    #[test]
    fn missing_platform_means_no_gpu() {
        assert!(matches!(
            enumerate_first_platform(&EmulatedOpenCl::without_platform()),
            Err(DispatchError::NoGpuDeviceFound)
        ));

        let api = EmulatedOpenCl::with_gpu();
        api.fail_at(FailurePoint::PlatformQuery);
        assert!(matches!(enumerate_first_platform(&api), Err(DispatchError::NoGpuDeviceFound)));
    }
}
