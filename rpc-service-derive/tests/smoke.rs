use std::convert::Infallible;

use rpc_service::{msg, stream, Message, ServiceBuilder, ServiceError};
use rpc_service_derive::Message;

#[derive(Debug, PartialEq, Message)]
struct GoodMsg;

impl GoodMsg {
    fn marshal(&self) -> Vec<u8> {
        Vec::new()
    }

    fn unmarshal(_bytes: &[u8]) -> Result<Self, Infallible> {
        Ok(GoodMsg)
    }
}

#[derive(Debug, PartialEq, Message)]
#[message(marshal = encode, unmarshal = decode)]
struct EncodeDecodeMsg(u8);

impl EncodeDecodeMsg {
    fn encode(&self) -> Vec<u8> {
        vec![self.0]
    }

    fn decode(bytes: &[u8]) -> Result<Self, String> {
        match bytes {
            [b] => Ok(EncodeDecodeMsg(*b)),
            _ => Err(format!("expected 1 byte, got {}", bytes.len())),
        }
    }
}

#[derive(Debug, Message)]
#[message(marshal = marshal)]
struct OnlyMarshal;

impl OnlyMarshal {
    fn marshal(&self) -> &'static [u8] {
        b""
    }
}

#[derive(Debug, Message)]
#[message()]
struct Nothing;

#[derive(Debug, Message)]
struct Json(String);

impl Json {
    fn marshal(&self) -> String {
        self.0.clone()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self, std::str::Utf8Error> {
        std::str::from_utf8(bytes).map(|s| Json(s.to_string()))
    }
}

#[test]
fn default_names() {
    let caps = GoodMsg::capabilities();
    assert!(caps.has_marshal("marshal"));
    assert!(caps.has_unmarshal("unmarshal"));

    let mut builder = ServiceBuilder::new("Service");
    builder
        .rpc("AnRpc", (msg::<GoodMsg>(), msg::<GoodMsg>()))
        .unwrap()
        .rpc("Stream", (stream(msg::<Json>()), msg::<Json>()))
        .unwrap();
    assert_eq!(builder.build().rpc_descs().len(), 2);
}

#[test]
fn custom_names() {
    let caps = EncodeDecodeMsg::capabilities();
    assert!(caps.has_marshal("encode"));
    assert!(caps.has_unmarshal("decode"));
    assert!(!caps.has_marshal("marshal"));

    let mut builder = ServiceBuilder::new("Service");
    let err = builder
        .rpc("AnRpc", (msg::<EncodeDecodeMsg>(), msg::<EncodeDecodeMsg>()))
        .unwrap_err();
    assert!(err.is_argument_error());

    builder
        .set_marshal_instance_method("encode")
        .set_unmarshal_class_method("decode");
    builder
        .rpc("AnRpc", (msg::<EncodeDecodeMsg>(), msg::<EncodeDecodeMsg>()))
        .unwrap();
    let service = builder.build();
    let marshaller = service.rpc_desc("AnRpc").unwrap().request().marshaller();
    let bytes = marshaller.marshal(&EncodeDecodeMsg(7)).unwrap();
    assert_eq!(&bytes[..], &[7]);
    assert_eq!(
        marshaller.unmarshal::<EncodeDecodeMsg>(&bytes).unwrap(),
        EncodeDecodeMsg(7)
    );
    assert!(marshaller.unmarshal::<EncodeDecodeMsg>(&[]).is_err());
}

#[test]
fn partial_capabilities() {
    let caps = OnlyMarshal::capabilities();
    assert!(caps.has_marshal("marshal"));
    assert!(!caps.has_unmarshal("unmarshal"));

    let caps = Nothing::capabilities();
    assert!(!caps.has_marshal("marshal"));
    assert!(!caps.has_unmarshal("unmarshal"));

    let mut builder = ServiceBuilder::new("Service");
    let err = builder
        .rpc("AnRpc", (msg::<OnlyMarshal>(), msg::<GoodMsg>()))
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingCapability { .. }));
    let err = builder
        .rpc("AnRpc", (msg::<GoodMsg>(), msg::<Nothing>()))
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingCapability { .. }));
    assert!(builder.build().rpc_descs().is_empty());
}
