#[cfg(test)]
pub mod fixtures {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use crate::config::FlushMode;
    use crate::metamodel::{AttributeMapping, CollectionMapping, EntityMapping, MetamodelRegistry};
    use crate::plan::{JdbcExecutor, JdbcMutation, JdbcSelect, SharedSession};
    use crate::results::Row;
    use crate::Result;

    pub fn person_mapping() -> EntityMapping {
        EntityMapping::new("Person", "person")
            .origin("app")
            .id("id", &["id"])
            .basic("name", &["name"])
            .basic("age", &["age"])
            .attribute(AttributeMapping::embedded(
                "address",
                vec![
                    AttributeMapping::basic("street", &["street"]),
                    AttributeMapping::basic("city", &["city"]),
                ],
            ))
            .attribute(AttributeMapping::to_one("employer", "Company", &["employer_id"]))
            .attribute(AttributeMapping::collection("phones", "Person.phones"))
            .attribute(AttributeMapping::collection("nicknames", "Person.nicknames"))
            .attribute(AttributeMapping::basic("notes", &["notes"]).not_selectable())
    }

    pub fn company_mapping() -> EntityMapping {
        EntityMapping::new("Company", "company")
            .origin("app")
            .id("id", &["id"])
            .basic("name", &["name"])
    }

    pub fn phone_mapping() -> EntityMapping {
        EntityMapping::new("Phone", "phone")
            .origin("app")
            .id("id", &["id"])
            .basic("number", &["number"])
    }

    pub fn order_mapping() -> EntityMapping {
        EntityMapping::new("Order", "orders")
            .origin("app")
            .id("id", &["id"])
            .basic("total", &["total"])
            .attribute(AttributeMapping::to_one_via_join_table(
                "customer",
                "Person",
                "customer_orders",
                &["customer_id"],
                "id",
            ))
    }

    pub fn phones_mapping() -> CollectionMapping {
        CollectionMapping::one_to_many("Person.phones", "Phone", "phone", &["person_id"], &["id"])
    }

    pub fn nicknames_mapping() -> CollectionMapping {
        CollectionMapping::elements("Person.nicknames", "person_nicknames", &["person_id"], &["nickname"])
            .with_index(&["position"])
    }

    pub fn metamodel() -> MetamodelRegistry {
        MetamodelRegistry::new()
            .with_entity(person_mapping())
            .with_entity(company_mapping())
            .with_entity(phone_mapping())
            .with_entity(order_mapping())
            .with_collection(phones_mapping())
            .with_collection(nicknames_mapping())
    }

    pub fn person_row(id: i64, name: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("age", 30i64)
            .with("street", "Rua Direita")
            .with("city", "Porto")
            .with("employer_id", crate::parameter::BindValue::Null)
    }

    #[derive(Clone, Default)]
    pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Runs `f` with a subscriber that records every event as plain text.
    pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    /// JDBC layer that returns canned rows and records every statement.
    #[derive(Debug, Default)]
    pub struct RecordingJdbc {
        rows: Vec<Row>,
        update_count: u64,
        selects: Mutex<Vec<JdbcSelect>>,
        mutations: Mutex<Vec<JdbcMutation>>,
    }

    impl RecordingJdbc {
        pub fn returning(rows: Vec<Row>) -> Self {
            Self {
                rows,
                ..Default::default()
            }
        }

        pub fn updating(update_count: u64) -> Self {
            Self {
                update_count,
                ..Default::default()
            }
        }

        pub fn selects(&self) -> Vec<JdbcSelect> {
            self.selects.lock().unwrap().clone()
        }

        pub fn mutations(&self) -> Vec<JdbcMutation> {
            self.mutations.lock().unwrap().clone()
        }
    }

    impl JdbcExecutor for RecordingJdbc {
        fn select(&self, statement: &JdbcSelect) -> Result<Vec<Row>> {
            self.selects.lock().unwrap().push(statement.clone());
            Ok(self.rows.clone())
        }

        fn execute_update(&self, statement: &JdbcMutation) -> Result<u64> {
            self.mutations.lock().unwrap().push(statement.clone());
            Ok(self.update_count)
        }
    }

    /// Session that records flush and cleanup requests as strings.
    #[derive(Debug)]
    pub struct RecordingSession {
        in_transaction: bool,
        flush_mode: FlushMode,
        events: Mutex<Vec<String>>,
    }

    impl RecordingSession {
        pub fn new(in_transaction: bool, flush_mode: FlushMode) -> Self {
            Self {
                in_transaction,
                flush_mode,
                events: Mutex::new(Vec::new()),
            }
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Default for RecordingSession {
        fn default() -> Self {
            Self::new(true, FlushMode::Auto)
        }
    }

    impl SharedSession for RecordingSession {
        fn is_transaction_in_progress(&self) -> bool {
            self.in_transaction
        }

        fn flush_mode(&self) -> FlushMode {
            self.flush_mode
        }

        fn flush(&self) -> Result<()> {
            self.events.lock().unwrap().push("flush".to_string());
            Ok(())
        }

        fn auto_flush_if_required(&self, query_spaces: &[String]) -> Result<bool> {
            self.events
                .lock()
                .unwrap()
                .push(format!("auto_flush:{}", query_spaces.join(",")));
            Ok(true)
        }

        fn register_bulk_operation_cleanup(&self, affected_tables: &[String]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("cleanup:{}", affected_tables.join(",")));
        }
    }
}
