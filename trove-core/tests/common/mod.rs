#![allow(dead_code)]
use std::borrow::Cow;
use trove_core::{
    AsValue, CaseConvention, DynamicType, PgComposite, PgEnum, PgTypeName, Record, Result,
    TypeRegistry, Value, composite_field, composite_from_value, dynamic_as_value,
    dynamic_from_value, enum_as_value, enum_from_value, unknown_dynamic_tag,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    Planned,
    ReadingNow,
    Finished,
}

impl PgEnum for ReadingStatus {
    const PG_TYPE_NAME: &'static str = "reading_status";
    const CASE_CONVENTION: CaseConvention = CaseConvention::UpperSnake;

    fn variants() -> &'static [Self] {
        &[
            ReadingStatus::Planned,
            ReadingStatus::ReadingNow,
            ReadingStatus::Finished,
        ]
    }
    fn variant_name(&self) -> &'static str {
        match self {
            ReadingStatus::Planned => "Planned",
            ReadingStatus::ReadingNow => "ReadingNow",
            ReadingStatus::Finished => "Finished",
        }
    }
}

impl AsValue for ReadingStatus {
    fn as_value(self) -> Value {
        enum_as_value(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        enum_from_value(value)
    }
}

impl PgTypeName for ReadingStatus {
    fn pg_type_name() -> Cow<'static, str> {
        Self::PG_TYPE_NAME.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub name: String,
    pub release_year: i32,
    pub regions: Vec<String>,
}

impl PgComposite for Platform {
    const PG_TYPE_NAME: &'static str = "platform";

    fn attributes() -> Vec<(&'static str, Cow<'static, str>)> {
        vec![
            ("name", String::pg_type_name()),
            ("release_year", i32::pg_type_name()),
            ("regions", Vec::<String>::pg_type_name()),
        ]
    }
    fn to_record(self) -> Record {
        Record::new(Self::PG_TYPE_NAME, Vec::new())
            .with("name", self.name)
            .with("release_year", self.release_year)
            .with("regions", self.regions)
    }
    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            name: composite_field(&mut record, "name")?,
            release_year: composite_field(&mut record, "release_year")?,
            regions: composite_field(&mut record, "regions")?,
        })
    }
}

impl AsValue for Platform {
    fn as_value(self) -> Value {
        Value::Composite(self.to_record())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        composite_from_value(value)
    }
}

impl PgTypeName for Platform {
    fn pg_type_name() -> Cow<'static, str> {
        Self::PG_TYPE_NAME.into()
    }
}

/// Game shelf entry, a composite holding an enum and an array of composites.
#[derive(Debug, Clone, PartialEq)]
pub struct Shelf {
    pub status: ReadingStatus,
    pub platforms: Vec<Platform>,
}

impl PgComposite for Shelf {
    const PG_TYPE_NAME: &'static str = "shelf";

    fn attributes() -> Vec<(&'static str, Cow<'static, str>)> {
        vec![
            ("status", ReadingStatus::pg_type_name()),
            ("platforms", Vec::<Platform>::pg_type_name()),
        ]
    }
    fn to_record(self) -> Record {
        Record::new(Self::PG_TYPE_NAME, Vec::new())
            .with("status", self.status)
            .with("platforms", self.platforms)
    }
    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            status: composite_field(&mut record, "status")?,
            platforms: composite_field(&mut record, "platforms")?,
        })
    }
}

impl AsValue for Shelf {
    fn as_value(self) -> Value {
        Value::Composite(self.to_record())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        composite_from_value(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Reading(serde_json::Value),
    Playing(serde_json::Value),
}

impl DynamicType for Activity {
    fn type_tags() -> &'static [&'static str] {
        &["reading", "playing"]
    }
    fn type_tag(&self) -> &'static str {
        match self {
            Activity::Reading(..) => "reading",
            Activity::Playing(..) => "playing",
        }
    }
    fn to_payload(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Activity::Reading(v) | Activity::Playing(v) => v.clone(),
        })
    }
    fn from_payload(tag: &str, payload: serde_json::Value) -> Result<Self> {
        match tag {
            "reading" => Ok(Activity::Reading(payload)),
            "playing" => Ok(Activity::Playing(payload)),
            _ => Err(unknown_dynamic_tag(tag)),
        }
    }
}

impl AsValue for Activity {
    fn as_value(self) -> Value {
        dynamic_as_value(&self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        dynamic_from_value(value)
    }
}

pub fn registry() -> TypeRegistry {
    TypeRegistry::builder()
        .register_enum::<ReadingStatus>()
        .register_composite::<Platform>()
        .register_composite::<Shelf>()
        .register_dynamic::<Activity>()
        .build()
        .unwrap()
}

pub fn switch() -> Platform {
    Platform {
        name: "Switch".into(),
        release_year: 2017,
        regions: vec!["EU".into(), "JP".into()],
    }
}
