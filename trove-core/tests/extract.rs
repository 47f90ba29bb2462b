mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Activity, Platform, ReadingStatus, Shelf, registry, switch};
    use serde_json::json;
    use std::sync::Arc;
    use trove_core::{
        AsValue, EnumValue, ErrorKind, Expander, Extractor, Params, Record, RowLabeled, Value,
    };

    /// Record shaped like the binary decoder returns it: positional, unnamed fields.
    fn positional(type_name: &str, fields: Vec<Value>) -> Value {
        Value::Composite(Record::new(
            type_name.to_string(),
            fields.into_iter().map(|v| ("".into(), v)).collect(),
        ))
    }

    #[test]
    fn extract_standard_passes_through() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        assert_eq!(
            extractor.extract_value(Value::Int64(5), "int8").unwrap(),
            Value::Int64(5)
        );
        assert_eq!(extractor.extract::<i64>(Value::Int32(5), "int4").unwrap(), 5);
        assert_eq!(
            extractor.extract_value(Value::Null, "platform").unwrap(),
            Value::Null
        );
    }

    #[test]
    fn extract_enum() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        let status: ReadingStatus = extractor
            .extract(Value::Varchar("FINISHED".into()), "reading_status")
            .unwrap();
        assert_eq!(status, ReadingStatus::Finished);
        let error = extractor
            .extract_value(Value::Varchar("Finished".into()), "reading_status")
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EnumConversionFailed);
    }

    #[test]
    fn extract_composite_by_position() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        let raw = positional(
            "platform",
            vec![
                Value::Varchar("Switch".into()),
                Value::Int32(2017),
                Value::Array(vec![Value::Varchar("EU".into()), Value::Varchar("JP".into())]),
            ],
        );
        let platform: Platform = extractor.extract(raw, "platform").unwrap();
        assert_eq!(platform, switch());
    }

    #[test]
    fn extract_composite_errors() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        let error = extractor
            .extract_value(
                positional("platform", vec![Value::Varchar("Switch".into())]),
                "platform",
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::WrongFieldNumberInComposite);

        // Nested failures are reported as a mapping failure of the outer composite
        let raw = positional(
            "shelf",
            vec![Value::Varchar("LOST".into()), Value::Array(vec![])],
        );
        let error = extractor.extract_value(raw, "shelf").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ObjectMappingFailed);

        // Field conversion failures as well
        let raw = positional(
            "platform",
            vec![
                Value::Varchar("Switch".into()),
                Value::Varchar("2017".into()),
                Value::Array(vec![]),
            ],
        );
        let error = extractor.extract::<Platform>(raw, "platform").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ObjectMappingFailed);
    }

    #[test]
    fn extract_dynamic() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        let raw = positional(
            "dynamic_dto",
            vec![
                Value::Varchar("playing".into()),
                Value::Json(json!({"game": "Zelda"})),
            ],
        );
        let activity: Activity = extractor.extract(raw, "dynamic_dto").unwrap();
        assert_eq!(activity, Activity::Playing(json!({"game": "Zelda"})));

        let raw = positional(
            "dynamic_dto",
            vec![Value::Varchar("cooking".into()), Value::Json(json!({}))],
        );
        let error = extractor.extract_value(raw, "dynamic_dto").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DynamicTypeNotFound);
    }

    #[test]
    fn extract_multi_dimensional_array() {
        let registry = registry();
        let extractor = Extractor::new(&registry);
        let raw = Value::Array(vec![
            Value::Array(vec![
                Value::Varchar("PLANNED".into()),
                Value::Varchar("FINISHED".into()),
            ]),
            Value::Array(vec![Value::Varchar("READING_NOW".into()), Value::Null]),
        ]);
        let grid: Vec<Vec<Option<ReadingStatus>>> =
            extractor.extract(raw, "_reading_status").unwrap();
        assert_eq!(
            grid,
            [
                vec![Some(ReadingStatus::Planned), Some(ReadingStatus::Finished)],
                vec![Some(ReadingStatus::ReadingNow), None],
            ]
        );
    }

    #[test]
    fn extract_row() {
        let registry = registry();
        let row = RowLabeled::new(
            Arc::from(["id".to_string(), "status".to_string()]),
            Arc::from(["int8".to_string(), "reading_status".to_string()]),
            vec![Value::Int64(1), Value::Varchar("PLANNED".into())].into_boxed_slice(),
        );
        let row = Extractor::new(&registry).extract_row(row).unwrap();
        assert_eq!(
            row.get_column("status"),
            Some(&Value::Enum(EnumValue::new("reading_status", "PLANNED")))
        );
    }

    /// Plays the store: feeds the flat parameters of an expansion back as the
    /// positional record the driver would decode.
    fn collapse(registry: &trove_core::TypeRegistry, name: &str, pg_type: &str, params: &Params) -> Value {
        use trove_core::TypeCategory;
        match registry.category(pg_type) {
            TypeCategory::Composite | TypeCategory::Dynamic => {
                let definition = registry.composite_definition(pg_type).unwrap();
                positional(
                    pg_type,
                    definition
                        .attributes
                        .iter()
                        .map(|(a, t)| collapse(registry, &format!("{}_{}", name, a), t, params))
                        .collect(),
                )
            }
            TypeCategory::Array => {
                let element = registry.array_definition(pg_type).unwrap().element_type;
                Value::Array(
                    (1..)
                        .map(|i| format!("{}_p{}", name, i))
                        .take_while(|v| {
                            params.contains_key(v)
                                || params.keys().any(|k| k.starts_with(&format!("{}_", v)))
                        })
                        .map(|v| collapse(registry, &v, &element, params))
                        .collect(),
                )
            }
            _ => match params[name].clone() {
                Value::Enum(v) => Value::Varchar(v.label.into_owned()),
                v => v,
            },
        }
    }

    #[test]
    fn extract_inverts_expand() {
        let registry = registry();
        let expander = Expander::new(&registry);
        let extractor = Extractor::new(&registry);
        let shelf = Shelf {
            status: ReadingStatus::ReadingNow,
            platforms: vec![
                switch(),
                Platform {
                    name: "Dreamcast".into(),
                    release_year: 1998,
                    regions: vec!["JP".into()],
                },
            ],
        };
        let expanded = expander
            .expand(
                "SELECT :shelf",
                Params::from([("shelf".to_string(), shelf.clone().as_value())]),
            )
            .unwrap();
        let raw = collapse(&registry, "shelf", "shelf", &expanded.params);
        let extracted: Shelf = extractor.extract(raw, "shelf").unwrap();
        assert_eq!(extracted, shelf);

        let activity = Activity::Reading(json!({"book": "Hyperion", "pages": [1, 2]}));
        let expanded = expander
            .expand(
                "SELECT :a",
                Params::from([("a".to_string(), activity.clone().as_value())]),
            )
            .unwrap();
        let raw = collapse(&registry, "a", "dynamic_dto", &expanded.params);
        let extracted: Activity = extractor.extract(raw, "dynamic_dto").unwrap();
        assert_eq!(extracted, activity);
    }
}
