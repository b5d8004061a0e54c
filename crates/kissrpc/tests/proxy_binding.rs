//! Binding local function slots and service declarations to remote methods.

use std::sync::Arc;

use tokio::sync::mpsc;

use kissrpc::Client;
use kissrpc::Error;
use kissrpc::Func;
use kissrpc::MethodTable;
use kissrpc::Server;
use kissrpc::Service;
use kissrpc::Wire;
use kissrpc::WireError;
use kissrpc::connect_service;

#[derive(Wire, Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Service, Default)]
pub struct Arith {
    pub sum: Func<(i64, i64), i64>,
    pub div: Func<(i64, i64), Result<i64, String>>,
    pub log: Func<(String,), ()>,
    calls: u32,
}

#[derive(Service, Default)]
#[service(name = "Geo")]
pub struct Geometry {
    pub norm2: Func<(Point,), i64>,
    pub mirror: Func<(Point,), Result<Point, kissrpc::Error>>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn arith(log: mpsc::UnboundedSender<String>) -> Arith {
    Arith {
        sum: Func::new(|a: i64, b: i64| a + b),
        div: Func::new(|a: i64, b: i64| {
            if b == 0 { Err("division by zero".to_owned()) } else { Ok(a / b) }
        }),
        log: Func::new(move |line: String| {
            let _ = log.send(line);
        }),
        calls: 0,
    }
}

fn geometry() -> Geometry {
    Geometry {
        norm2: Func::new(|p: Point| p.x * p.x + p.y * p.y),
        mirror: Func::new(|p: Point| -> Result<Point, kissrpc::Error> { Ok(Point { x: p.y, y: p.x }) }),
    }
}

/// Serves `table` on one end of a duplex stream and returns the other end.
fn serve(table: MethodTable) -> (tokio::io::DuplexStream, Arc<Server>) {
    init_tracing();
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let server = Arc::new(Server::new(server_io, table));
    tokio::spawn({
        let server = server.clone();
        async move { server.serve().await }
    });
    (client_io, server)
}

fn sum_table() -> MethodTable {
    let mut table = MethodTable::new();
    table.add_func("Sum", |a: i64, b: i64| a + b);
    table
}

// ===== SINGLE SLOTS =====

#[tokio::test]
async fn test_proxy_func_forwards_calls() -> kissrpc::Result<()> {
    let (io, _server) = serve(sum_table());
    let client = Client::new(io);

    let mut sum: Func<(i64, i64), i64> = Func::unbound();
    client.make_proxy_func("Sum", &mut sum).await?;
    assert!(sum.is_bound());
    assert_eq!(sum.call((2, 3)).await, 5);
    assert_eq!(sum.clone().call((-4, 4)).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_signature_mismatch_leaves_slot_unbound() -> kissrpc::Result<()> {
    let (io, _server) = serve(sum_table());
    let client = Client::new(io);

    let mut narrow: Func<(i32, i32), i64> = Func::unbound();
    let err = client.make_proxy_func("Sum", &mut narrow).await.unwrap_err();
    match err {
        Error::SignatureMismatch { method, local, remote } => {
            assert_eq!(method, "Sum");
            assert_eq!(local, "fn(i32, i32) -> i64");
            assert_eq!(remote, "fn(i64, i64) -> i64");
        }
        other => panic!("expected a signature mismatch, got {other}"),
    }
    assert!(!narrow.is_bound());

    let mut fallible: Func<(i64, i64), Result<i64, String>> = Func::unbound();
    assert!(matches!(
        client.make_proxy_func("Sum", &mut fallible).await,
        Err(Error::SignatureMismatch { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_bare_error_output_is_not_bound() -> kissrpc::Result<()> {
    let mut table = MethodTable::new();
    table.add_func("Div", |a: i64, b: i64| -> Result<i64, String> {
        if b == 0 { Err("division by zero".to_owned()) } else { Ok(a / b) }
    });
    let (io, _server) = serve(table);
    let client = Client::new(io);

    // renders the same as the remote `(i64, error)`, but has no error channel
    let mut div: Func<(i64, i64), (i64, WireError)> = Func::unbound();
    let err = client.make_proxy_func("Div", &mut div).await.unwrap_err();
    assert!(matches!(err, Error::InvalidOutputs(_)));
    assert!(!div.is_bound());

    let mut div: Func<(i64, i64), Result<i64, WireError>> = Func::unbound();
    client.make_proxy_func("Div", &mut div).await?;
    assert_eq!(div.call((1, 0)).await, Err(WireError::remote("division by zero")));
    Ok(())
}

#[tokio::test]
async fn test_unknown_method_is_not_bound() -> kissrpc::Result<()> {
    let (io, _server) = serve(sum_table());
    let client = Client::new(io);

    let mut missing: Func<(), i64> = Func::unbound();
    let err = client.make_proxy_func("Product", &mut missing).await.unwrap_err();
    assert!(matches!(err, Error::MethodNotFound(ref name) if name == "Product"));
    assert!(!missing.is_bound());
    Ok(())
}

#[tokio::test]
async fn test_binder_reuses_one_table() -> kissrpc::Result<()> {
    let mut table = sum_table();
    table.add_func("Neg", |a: i64| -a);
    let (io, _server) = serve(table);
    let client = Client::new(io);

    let binder = client.binder().await?;
    assert!(binder.table().contains_key("Neg"));

    let mut sum: Func<(i64, i64), i64> = Func::unbound();
    let mut neg: Func<(i64,), i64> = Func::unbound();
    binder.bind("Sum", &mut sum)?;
    binder.bind("Neg", &mut neg)?;
    assert_eq!(neg.call((sum.call((1, 2)).await,)).await, -3);
    Ok(())
}

// ===== SERVICES =====

#[tokio::test]
async fn test_service_roundtrip() -> kissrpc::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut table = MethodTable::new();
    table.add_service(arith(tx));
    assert!(table.contains("Arith.sum"));
    assert!(table.contains("Arith.div"));
    assert!(table.contains("Arith.log"));
    assert_eq!(Arith::NAME, "Arith");

    let (io, _server) = serve(table);
    let mut remote = Arith::default();
    let _client = connect_service(io, &mut remote).await?;

    assert_eq!(remote.sum.call((2, 3)).await, 5);
    assert_eq!(remote.div.call((6, 3)).await, Ok(2));
    assert_eq!(remote.div.call((1, 0)).await, Err("division by zero".to_owned()));

    remote.log.call(("hello".to_owned(),)).await;
    assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    assert_eq!(remote.calls, 0);
    Ok(())
}

#[tokio::test]
async fn test_service_with_struct_types() -> kissrpc::Result<()> {
    let mut table = MethodTable::new();
    table.add_service(geometry());
    assert_eq!(Geometry::NAME, "Geo");

    let (io, _server) = serve(table);
    let client = Client::new(io);
    let mut remote = Geometry::default();
    client.make_service(&mut remote).await?;

    // binding taught the client registry about Point
    assert!(client.registry().contains("Point"));
    assert_eq!(remote.norm2.call((Point { x: 3, y: 4 },)).await, 25);
    assert_eq!(remote.mirror.call((Point { x: 1, y: 2 },)).await?, Point { x: 2, y: 1 });
    Ok(())
}

// ===== FAILURES =====

#[tokio::test]
async fn test_failed_call_lands_in_error_output() -> kissrpc::Result<()> {
    let mut table = MethodTable::new();
    table.add_service(geometry());
    let (io, server) = serve(table);

    let mut remote = Geometry::default();
    let _client = connect_service(io, &mut remote).await?;

    server.stop().await;
    let err = remote.mirror.call((Point { x: 1, y: 2 },)).await.unwrap_err();
    assert!(err.is_fatal());
    Ok(())
}

#[tokio::test]
async fn test_failed_call_without_error_output_panics() -> kissrpc::Result<()> {
    let (io, server) = serve(sum_table());
    let client = Client::new(io);

    let mut sum: Func<(i64, i64), i64> = Func::unbound();
    client.make_proxy_func("Sum", &mut sum).await?;

    server.stop().await;
    let outcome = tokio::spawn(async move { sum.call((1, 2)).await }).await;
    let err = outcome.unwrap_err();
    assert!(err.is_panic());
    Ok(())
}
