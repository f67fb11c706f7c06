use common::domain::{DeviceRegistry, FindDeviceInput, FindGroupInput};
use common::provisioning::{InMemoryDeviceRegistry, ProvisioningFile, RegistryDefaults};

fn sample_path() -> String {
    format!("{}/../../provisioning/devices.json", env!("CARGO_MANIFEST_DIR"))
}

#[tokio::test]
async fn test_sample_provisioning_file_loads() {
    let file = ProvisioningFile::from_path(sample_path()).unwrap();
    let registry =
        InMemoryDeviceRegistry::from_provisioning(file, &RegistryDefaults::default()).unwrap();

    let device = registry
        .find_device_by_api_key_and_id(FindDeviceInput {
            api_key: "1234".to_string(),
            device_id: "MQTT_2".to_string(),
        })
        .await
        .unwrap()
        .expect("MQTT_2 should be provisioned");
    assert_eq!(device.entity_name, "Second MQTT Device");
    assert_eq!(device.service, "smartGondor");
    assert_eq!(device.static_attributes.len(), 1);

    let group = registry
        .find_group_by_api_key(FindGroupInput {
            api_key: "80K09H324HV8732".to_string(),
        })
        .await
        .unwrap()
        .expect("group should be provisioned");
    assert_eq!(group.timestamp, Some(true));
    assert_eq!(group.attributes.len(), 2);
}
