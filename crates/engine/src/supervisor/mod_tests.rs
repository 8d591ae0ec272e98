// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use gantry_transport::local::LocalHttpListener;

use super::*;

fn quiet_options() -> MainOptions {
    MainOptions { dump_failure: false, ..MainOptions::default() }
}

struct Recorder {
    order: Arc<parking_lot::Mutex<Vec<&'static str>>>,
    name: &'static str,
}

impl Object for Recorder {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

impl Procedure for Recorder {
    fn run(&self, _ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        self.order.lock().push(self.name);
        Ok(())
    }
    fn cancel(&self) {}
}

struct Failing;

impl Object for Failing {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

impl Procedure for Failing {
    fn run(&self, _ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        Err("procedure exploded".into())
    }
    fn cancel(&self) {}
}

#[test]
fn run_with_no_entries_returns_cleanly() {
    let main = Main::new(quiet_options());
    let ctx = ObjectRegistry::new();
    (main.clone() as Arc<dyn Procedure>).run(&ctx).unwrap();
    assert_eq!(main.registry().running_count(), 0);
}

#[test]
fn entries_start_in_declaration_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let main = Main::new(quiet_options());
    main.add_procedure(Arc::new(Recorder { order: Arc::clone(&order), name: "first" })).unwrap();
    main.add_procedure(Arc::new(Recorder { order: Arc::clone(&order), name: "second" })).unwrap();

    (main.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();
    assert_eq!(*order.lock(), vec!["first", "second"]);
}

#[test]
fn referenced_procedures_resolve_through_the_root_registry() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let main = Main::new(quiet_options());
    main.objects()
        .add_object("job", Arc::new(Recorder { order: Arc::clone(&order), name: "job" }))
        .unwrap();
    main.add_procedure_ref("job").unwrap();

    (main.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();
    assert_eq!(*order.lock(), vec!["job"]);
}

#[test]
fn failures_propagate_unless_caught() {
    let main = Main::new(quiet_options());
    main.add_procedure(Arc::new(Failing)).unwrap();
    let err = (main.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new());
    assert!(err.is_err());
}

#[test]
fn catch_failure_swallows_the_error() {
    let main = Main::new(MainOptions { catch_failure: true, ..quiet_options() });
    main.add_procedure(Arc::new(Failing)).unwrap();
    (main.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();
}

#[test]
fn failure_return_code_is_published() {
    let main = Main::new(MainOptions {
        catch_failure: true,
        failure_return_code: Some(3),
        ..quiet_options()
    });
    main.add_procedure(Arc::new(Failing)).unwrap();

    let ctx = ObjectRegistry::new();
    (main.clone() as Arc<dyn Procedure>).run(&ctx).unwrap();

    let code = ctx.find_object_as::<Value<i32>>("return-code").unwrap();
    assert_eq!(code.get(), 3);
}

#[test]
fn return_code_object_is_updated_when_it_already_exists() {
    let main = Main::new(MainOptions {
        catch_failure: true,
        failure_return_code: Some(7),
        ..quiet_options()
    });
    main.add_procedure(Arc::new(Failing)).unwrap();

    let ctx = ObjectRegistry::new();
    ctx.add_object("return-code", Arc::new(Value::new(0i32))).unwrap();
    (main.clone() as Arc<dyn Procedure>).run(&ctx).unwrap();

    let code = ctx.find_object_as::<Value<i32>>("return-code").unwrap();
    assert_eq!(code.get(), 7);
}

#[test]
fn run_blocks_on_servers_until_cancelled() {
    let listener = LocalHttpListener::new();
    let main = Main::new(quiet_options());
    let server = crate::http::HttpServer::new(listener.clone(), false, Arc::clone(main.registry()));
    main.add_http_server(server);

    let runner_main = Arc::clone(&main);
    let runner = std::thread::spawn(move || {
        (runner_main as Arc<dyn Procedure>).run(&ObjectRegistry::new())
    });

    // The server registers itself and stays running.
    assert!(wait_until(|| listener.is_listening(), Duration::from_secs(2)));
    assert_eq!(main.registry().running_count(), 1);
    assert!(!runner.is_finished());

    (main.clone() as Arc<dyn Procedure>).cancel();
    assert!(listener.wait_released(Duration::from_secs(2)));
    runner.join().unwrap().unwrap();
    assert_eq!(main.registry().running_count(), 0);
}

#[test]
fn cancel_is_idempotent_once_procedures_finished() {
    let main = Main::new(quiet_options());
    (main.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();
    // Nothing is running; repeated cancels are no-ops.
    (main.clone() as Arc<dyn Procedure>).cancel();
    (main.clone() as Arc<dyn Procedure>).cancel();
}

#[test]
fn terminate_counter_decrements_without_aborting_while_positive() {
    let main = Main::new(MainOptions { terminate_counter: Some(2), ..quiet_options() });
    // Two cancels consume the counter; the process must survive both.
    (main.clone() as Arc<dyn Procedure>).cancel();
    (main.clone() as Arc<dyn Procedure>).cancel();
}

#[test]
fn certificates_load_eagerly_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("host.key");
    let cert_path = dir.path().join("host.crt");
    std::fs::write(&key_path, b"key-bytes").unwrap();
    std::fs::write(&cert_path, b"cert-bytes").unwrap();

    let main = Main::new(quiet_options());
    main.add_certificate_files("example.org", &key_path, &cert_path).unwrap();

    let certificates = main.certificates();
    let certificate = certificates.get("example.org").unwrap();
    assert_eq!(certificate.key, b"key-bytes");
    assert_eq!(certificate.certificate, b"cert-bytes");
}

#[test]
fn missing_certificate_files_fail_eagerly() {
    let main = Main::new(quiet_options());
    let err = main.add_certificate_files(
        "example.org",
        std::path::Path::new("/nonexistent/host.key"),
        std::path::Path::new("/nonexistent/host.crt"),
    );
    assert!(matches!(err, Err(EngineError::CertificateIo { kind: "key", .. })));
}

fn wait_until(predicate: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}
