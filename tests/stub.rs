
use bytes::Bytes;
use futures_lite::{stream, StreamExt};
use msgs::*;
use rpc_service::{
    rpc_service, ClientError, Code, Handlers, LocalChannel, Server, ServiceDef, ServiceError,
    Status, Stub,
};
use testresult::TestResult;

#[derive(Debug, derive_more::Display)]
enum ComputeError {
    #[display("the number is too large")]
    Overflow,
}

fn compute_service() -> Result<ServiceDef, ServiceError> {
    rpc_service! {
        service ComputeService {
            rpc Sqr(Sqr) returns (SqrResponse);
            rpc Sum(stream SumUpdate) returns (SumResponse);
            rpc Fibonacci(Fibonacci) returns (stream FibonacciResponse);
            rpc Multiply(stream Multiply) returns (stream MultiplyResponse);
        }
    }
}

fn sqr_service() -> Result<ServiceDef, ServiceError> {
    rpc_service! {
        service SqrService {
            rpc Sqr(Sqr) returns (SqrResponse);
        }
    }
}

fn connect(service: &ServiceDef, handlers: Handlers) -> TestResult<Stub> {
    let server = Server::new(service.clone(), handlers)?;
    Ok(service
        .rpc_stub_class()
        .new_stub("localhost")
        .with_channel(LocalChannel::new(server)))
}

fn status_code(err: ClientError) -> Option<Code> {
    match err {
        ClientError::Status(status) => Some(status.code()),
        _ => None,
    }
}

#[tokio::test]
async fn unary_call() -> TestResult {
    init_logging();
    let stub = connect(&compute_service()?, compute_handlers())?;
    let res: SqrResponse = stub.unary("sqr", Sqr(12)).await?;
    assert_eq!(res, SqrResponse(144));
    Ok(())
}

#[tokio::test]
async fn client_streaming_call() -> TestResult {
    init_logging();
    let stub = connect(&compute_service()?, compute_handlers())?;
    let updates = stream::iter((1..=4).map(SumUpdate));
    let res: SumResponse = stub.client_streaming("sum", updates).await?;
    assert_eq!(res, SumResponse(10));

    let res: SumResponse = stub.client_streaming("sum", stream::empty::<SumUpdate>()).await?;
    assert_eq!(res, SumResponse(0));
    Ok(())
}

#[tokio::test]
async fn server_streaming_call() -> TestResult {
    init_logging();
    let stub = connect(&compute_service()?, compute_handlers())?;
    let items: Vec<FibonacciResponse> = stub
        .server_streaming("fibonacci", Fibonacci(10))?
        .try_collect()
        .await?;
    let items: Vec<u128> = items.into_iter().map(|item| item.0).collect();
    assert_eq!(items, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    Ok(())
}

#[tokio::test]
async fn bidi_streaming_call() -> TestResult {
    init_logging();
    let stub = connect(&compute_service()?, compute_handlers())?;
    let reqs = stream::iter(vec![Multiply(2, 3), Multiply(4, 5), Multiply(0, 7)]);
    let items: Vec<MultiplyResponse> = stub.bidi_streaming("multiply", reqs)?.try_collect().await?;
    assert_eq!(
        items,
        vec![MultiplyResponse(6), MultiplyResponse(20), MultiplyResponse(0)]
    );
    Ok(())
}

#[tokio::test]
async fn stubs_without_channel_are_unavailable() -> TestResult {
    let stub = compute_service()?.rpc_stub_class().new_stub("fakehostname");
    let err = stub
        .unary::<Sqr, SqrResponse>("sqr", Sqr(2))
        .await
        .unwrap_err();
    assert_eq!(status_code(err), Some(Code::Unavailable));

    let mut responses =
        stub.server_streaming::<Fibonacci, FibonacciResponse>("fibonacci", Fibonacci(3))?;
    let err = responses.next().await.unwrap().unwrap_err();
    assert_eq!(status_code(err), Some(Code::Unavailable));
    assert!(responses.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn calls_are_checked_against_the_rpc() -> TestResult {
    let stub = connect(&compute_service()?, compute_handlers())?;

    let err = stub
        .unary::<Sqr, SqrResponse>("Sqr", Sqr(2))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::UnknownMethod("Sqr".to_string()));

    let err = stub
        .unary::<SumUpdate, SumResponse>("sum", SumUpdate(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::KindMismatch { .. }));

    let err = stub
        .unary::<SumUpdate, SqrResponse>("sqr", SumUpdate(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TypeMismatch { .. }));

    let err = stub
        .unary::<Sqr, SumResponse>("sqr", Sqr(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TypeMismatch { .. }));
    Ok(())
}

#[test]
fn servers_need_all_methods() -> TestResult {
    let service = compute_service()?;
    let err = Server::new(service, Handlers::new().unary("sqr", sqr)).unwrap_err();
    assert_eq!(err.missing, vec!["Fibonacci", "Multiply", "Sum"]);
    Ok(())
}

#[tokio::test]
async fn unknown_rpcs_are_unimplemented() -> TestResult {
    let server = Server::new(compute_service()?, compute_handlers())?;
    let mut responses = server.dispatch("Divide", stream::empty().boxed());
    let status = responses.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
    assert!(responses.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_requests_are_invalid() -> TestResult {
    init_logging();
    let server = Server::new(sqr_service()?, compute_handlers())?;

    let mut responses = server.dispatch("Sqr", stream::once(Bytes::new()).boxed());
    let status = responses.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let mut responses = server.dispatch("Sqr", stream::empty().boxed());
    let status = responses.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    Ok(())
}

#[tokio::test]
async fn handler_errors_reach_the_client() -> TestResult {
    init_logging();
    let handlers = Handlers::new().unary("sqr", |req: Sqr| async move {
        req.0
            .checked_mul(req.0)
            .map(|n| SqrResponse(n as u128))
            .ok_or_else(|| Status::invalid_argument(ComputeError::Overflow.to_string()))
    });
    let stub = connect(&sqr_service()?, handlers)?;

    let res: SqrResponse = stub.unary("sqr", Sqr(3)).await?;
    assert_eq!(res, SqrResponse(9));

    let err = stub
        .unary::<Sqr, SqrResponse>("sqr", Sqr(u64::MAX))
        .await
        .unwrap_err();
    match err {
        ClientError::Status(status) => {
            assert_eq!(status.code(), Code::InvalidArgument);
            assert_eq!(status.message(), "the number is too large");
        }
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn response_streams_end_after_an_error() -> TestResult {
    init_logging();
    let service = rpc_service! {
        service Failing {
            rpc Fibonacci(Fibonacci) returns (stream FibonacciResponse);
        }
    }?;
    let handlers = Handlers::new().server_streaming("fibonacci", |_: Fibonacci| {
        stream::iter(vec![
            Ok(FibonacciResponse(0)),
            Err(Status::internal("boom")),
            Ok(FibonacciResponse(1)),
        ])
    });
    let stub = connect(&service, handlers)?;
    let items: Vec<Result<FibonacciResponse, ClientError>> = stub
        .server_streaming("fibonacci", Fibonacci(3))?
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok(FibonacciResponse(0)));
    assert_eq!(
        items[1],
        Err(ClientError::Status(Status::internal("boom")))
    );
    Ok(())
}

#[tokio::test]
async fn mismatched_method_shapes_fail_at_dispatch() -> TestResult {
    init_logging();
    let handlers = Handlers::new().server_streaming("sqr", |req: Sqr| {
        stream::once(Ok::<_, Status>(SqrResponse(req.0 as u128)))
    });
    // accepted with a warning
    let stub = connect(&sqr_service()?, handlers)?;
    let err = stub
        .unary::<Sqr, SqrResponse>("sqr", Sqr(2))
        .await
        .unwrap_err();
    assert_eq!(status_code(err), Some(Code::Internal));
    Ok(())
}

#[tokio::test]
async fn sub_service_servers_use_inherited_methods() -> TestResult {
    init_logging();
    let base = sqr_service()?;
    let extended = rpc_service! {
        service Extended extends base {
            rpc Sum(stream SumUpdate) returns (SumResponse);
        }
    }?;
    let base_handlers = Handlers::new().unary("sqr", sqr);
    let handlers = Handlers::inherit(&base_handlers).client_streaming("sum", sum);
    let stub = connect(&extended, handlers)?;

    let res: SqrResponse = stub.unary("sqr", Sqr(5)).await?;
    assert_eq!(res, SqrResponse(25));
    let res: SumResponse = stub
        .client_streaming("sum", stream::iter(vec![SumUpdate(1), SumUpdate(2)]))
        .await?;
    assert_eq!(res, SumResponse(3));
    Ok(())
}
