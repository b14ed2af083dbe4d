//! MCAP fixtures shared by the integration tests

#![allow(dead_code)]

use mcap::records::MessageHeader;
use prost::Message as _;
use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const POSITION_TOPIC: &str = "evelogger_vectornav_position_data";
pub const IMU_TOPIC: &str = "imu";

/// One JSON message: (log_time ns, topic, body)
pub type JsonMessage<'a> = (u64, &'a str, &'a str);

/// Write a container whose channels all carry schemaless JSON
pub fn write_json_mcap(path: &Path, messages: &[JsonMessage<'_>]) {
    let mut writer = mcap::Writer::new(BufWriter::new(File::create(path).unwrap())).unwrap();
    let mut channels: BTreeMap<String, u16> = BTreeMap::new();
    for (sequence, (log_time, topic, body)) in messages.iter().enumerate() {
        let channel_id = match channels.get(*topic) {
            Some(id) => *id,
            None => {
                let id = writer.add_channel(0, topic, "json", &BTreeMap::new()).unwrap();
                channels.insert(topic.to_string(), id);
                id
            }
        };
        writer
            .write_to_known_channel(
                &MessageHeader {
                    channel_id,
                    sequence: sequence as u32,
                    log_time: *log_time,
                    publish_time: *log_time,
                },
                body.as_bytes(),
            )
            .unwrap();
    }
    writer.finish().unwrap();
}

/// A realistic drive log: GPS fixes on the position channel, IMU-style samples elsewhere
pub fn write_drive_log(path: &Path) {
    write_json_mcap(
        path,
        &[
            (
                1_755_213_040_000_000_000,
                POSITION_TOPIC,
                r#"{"position": {"lat": 51.5, "lon": -0.125}, "vectornav": {"yaw": 90.0}}"#,
            ),
            (1_755_213_040_000_000_000, "battery", r#"{"voltage": 12.5}"#),
            (
                1_755_213_040_500_000_000,
                POSITION_TOPIC,
                r#"{"position": {"lat": 51.6, "lon": -0.25}, "vectornav": {"yaw": 91.5}}"#,
            ),
            (
                1_755_213_041_000_000_000,
                POSITION_TOPIC,
                r#"{"position": {"lat": "lost", "lon": "lost"}, "vectornav": {"yaw": 92.0}}"#,
            ),
        ],
    );
}

fn field(name: &str, number: i32, ty: Type, label: Label, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// `telemetry.Imu { Vector3 orientation; repeated float samples; string status; bytes raw; }`
pub fn imu_descriptor_set() -> Vec<u8> {
    let vector3 = DescriptorProto {
        name: Some("Vector3".to_string()),
        field: vec![
            field("x", 1, Type::Double, Label::Optional, None),
            field("y", 2, Type::Double, Label::Optional, None),
            field("z", 3, Type::Double, Label::Optional, None),
        ],
        ..Default::default()
    };
    let imu = DescriptorProto {
        name: Some("Imu".to_string()),
        field: vec![
            field("orientation", 1, Type::Message, Label::Optional, Some(".telemetry.Vector3")),
            field("samples", 2, Type::Float, Label::Repeated, None),
            field("status", 3, Type::String, Label::Optional, None),
            field("raw", 4, Type::Bytes, Label::Optional, None),
        ],
        ..Default::default()
    };
    let file = FileDescriptorProto {
        name: Some("imu.proto".to_string()),
        package: Some("telemetry".to_string()),
        message_type: vec![vector3, imu],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };
    FileDescriptorSet { file: vec![file] }.encode_to_vec()
}

pub fn imu_message(pool: &DescriptorPool, x: f64, samples: &[f32], status: &str) -> Vec<u8> {
    let mut orientation = DynamicMessage::new(pool.get_message_by_name("telemetry.Vector3").unwrap());
    orientation.set_field_by_name("x", Value::F64(x));
    orientation.set_field_by_name("y", Value::F64(0.0));
    orientation.set_field_by_name("z", Value::F64(-1.0));

    let mut imu = DynamicMessage::new(pool.get_message_by_name("telemetry.Imu").unwrap());
    imu.set_field_by_name("orientation", Value::Message(orientation));
    imu.set_field_by_name(
        "samples",
        Value::List(samples.iter().map(|s| Value::F32(*s)).collect()),
    );
    imu.set_field_by_name("status", Value::String(status.to_string()));
    imu.set_field_by_name("raw", Value::Bytes(prost::bytes::Bytes::from_static(b"\x01\xff")));
    imu.encode_to_vec()
}

/// Container with one protobuf IMU channel; messages are (log_time, x, samples)
pub fn write_protobuf_mcap(path: &Path, messages: &[(u64, f64, &[f32])]) {
    let descriptor_set = imu_descriptor_set();
    let pool = DescriptorPool::decode(descriptor_set.as_slice()).unwrap();

    let mut writer = mcap::Writer::new(BufWriter::new(File::create(path).unwrap())).unwrap();
    let schema_id = writer
        .add_schema("telemetry.Imu", "protobuf", &descriptor_set)
        .unwrap();
    let channel_id = writer
        .add_channel(schema_id, IMU_TOPIC, "protobuf", &BTreeMap::new())
        .unwrap();

    for (sequence, (log_time, x, samples)) in messages.iter().enumerate() {
        let body = imu_message(&pool, *x, samples, "ok");
        writer
            .write_to_known_channel(
                &MessageHeader {
                    channel_id,
                    sequence: sequence as u32,
                    log_time: *log_time,
                    publish_time: *log_time,
                },
                &body,
            )
            .unwrap();
    }
    writer.finish().unwrap();
}
