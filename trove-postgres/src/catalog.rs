use crate::PostgresConnection;
use indoc::indoc;
use std::future::Future;
use trove_core::{Catalog, CatalogSource, Context, Result};

const ENUMS: &str = indoc! {"
    SELECT t.typname::text, e.enumlabel::text
    FROM pg_type t
    JOIN pg_namespace n ON n.oid = t.typnamespace
    JOIN pg_enum e ON e.enumtypid = t.oid
    WHERE n.nspname::text = ANY($1::text[])
    ORDER BY t.typname, e.enumsortorder
"};

const COMPOSITES: &str = indoc! {"
    SELECT t.typname::text, a.attname::text, at.typname::text
    FROM pg_type t
    JOIN pg_namespace n ON n.oid = t.typnamespace
    JOIN pg_class c ON c.oid = t.typrelid
    JOIN pg_attribute a ON a.attrelid = c.oid
    JOIN pg_type at ON at.oid = a.atttypid
    WHERE n.nspname::text = ANY($1::text[])
      AND c.relkind = 'c'
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY t.typname, a.attnum
"};

const ARRAYS: &str = indoc! {"
    SELECT t.typname::text, e.typname::text
    FROM pg_type t
    JOIN pg_namespace n ON n.oid = t.typnamespace
    JOIN pg_type e ON e.oid = t.typelem
    WHERE n.nspname::text = ANY($1::text[])
      AND t.typcategory = 'A'
"};

impl PostgresConnection {
    async fn read_catalog(&self, schemas: &[String]) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        let rows = self
            .client
            .query(ENUMS, &[&schemas])
            .await
            .context("While reading the enum types")?;
        for row in rows {
            let name: String = row.get(0);
            let label: String = row.get(1);
            match catalog.enums.last_mut() {
                Some(last) if last.name == name => last.labels.push(label),
                _ => catalog = catalog.with_enum(name, [label]),
            }
        }
        let rows = self
            .client
            .query(COMPOSITES, &[&schemas])
            .await
            .context("While reading the composite types")?;
        for row in rows {
            let name: String = row.get(0);
            let attribute: (String, String) = (row.get(1), row.get(2));
            match catalog.composites.last_mut() {
                Some(last) if last.name == name => last.attributes.push(attribute),
                _ => catalog = catalog.with_composite(name, [attribute]),
            }
        }
        let rows = self
            .client
            .query(ARRAYS, &[&schemas])
            .await
            .context("While reading the array types")?;
        for row in rows {
            catalog = catalog.with_array(row.get::<_, String>(0), row.get::<_, String>(1));
        }
        log::debug!(
            "Read {} enums, {} composites and {} arrays from schemas {:?}",
            catalog.enums.len(),
            catalog.composites.len(),
            catalog.arrays.len(),
            schemas
        );
        Ok(catalog)
    }
}

impl CatalogSource for PostgresConnection {
    fn load_catalog(
        &mut self,
        schemas: &[String],
    ) -> impl Future<Output = Result<Catalog>> + Send {
        self.read_catalog(schemas)
    }
}
