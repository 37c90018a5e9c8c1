// Copyright (c) 2022-2023 The MobileCoin Foundation

//! EIP-712 encoder frame-stream tests

use serde_json::json;

use ledger_eth::{
    apdu::{p1, p2, path::DerivationPath, Instruction},
    eip712::{message_frames, typed_data_frames, MessageFilters, TypedData},
    DeviceHandle, Error,
};

mod helpers;
use helpers::{init_logging, test_keychain, MockExchange};

fn derivation_path() -> DerivationPath {
    "m/44'/60'/0'/0/0".parse().unwrap()
}

fn minimal_message() -> TypedData {
    serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [{"name": "chainId", "type": "uint256"}],
            "Mail": [{"name": "value", "type": "uint8"}]
        },
        "primaryType": "Mail",
        "domain": {"name": "Test", "chainId": 1},
        "message": {"value": 5}
    }))
    .unwrap()
}

#[test]
fn minimal_message_frame_sequence() {
    init_logging();
    let keychain = test_keychain();

    let frames =
        typed_data_frames::<String>(&keychain, &minimal_message(), None, &derivation_path())
            .unwrap();

    // per declared struct: one name frame and one field frame, then
    // root + value for the domain, root + value for the message, then sign
    assert_eq!(frames.len(), 9);

    assert_eq!(frames[0].ins, Instruction::Eip712SendStructDef as u8);
    assert_eq!(frames[0].p2, p2::STRUCT_NAME);
    assert_eq!(frames[0].data, b"EIP712Domain".to_vec());

    assert_eq!(frames[1].ins, Instruction::Eip712SendStructDef as u8);
    assert_eq!(frames[1].p2, p2::STRUCT_FIELD);

    assert_eq!(frames[2].data, b"Mail".to_vec());
    assert_eq!(frames[3].p2, p2::STRUCT_FIELD);

    assert_eq!(frames[4].ins, Instruction::Eip712SendStructImpl as u8);
    assert_eq!(frames[4].p2, p2::STRUCT_NAME);
    assert_eq!(frames[4].data, b"EIP712Domain".to_vec());

    // chainId = 1, length-prefixed minimal integer
    assert_eq!(frames[5].p2, p2::STRUCT_FIELD);
    assert_eq!(frames[5].p1, p1::COMPLETE_SEND);
    assert_eq!(frames[5].data, vec![0x00, 0x01, 0x01]);

    assert_eq!(frames[6].p2, p2::STRUCT_NAME);
    assert_eq!(frames[6].data, b"Mail".to_vec());

    // value = 5
    assert_eq!(frames[7].data, vec![0x00, 0x01, 0x05]);

    assert_eq!(frames[8].ins, Instruction::Eip712Sign as u8);
    assert_eq!(frames[8].p2, p2::NEW_IMPLEM);
    assert_eq!(frames[8].data, derivation_path().pack());
}

#[test]
fn fixed_array_size_is_enforced() {
    let keychain = test_keychain();
    let data: TypedData = serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [{"name": "chainId", "type": "uint256"}],
            "Mail": [{"name": "attachments", "type": "string[3]"}]
        },
        "primaryType": "Mail",
        "domain": {"chainId": 1},
        "message": {"attachments": ["a", "b"]}
    }))
    .unwrap();

    let err = message_frames::<String>(&keychain, &data, None).unwrap_err();
    match err {
        Error::ArraySizeMismatch { expected, actual } => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_struct_aborts() {
    let keychain = test_keychain();
    let data: TypedData = serde_json::from_value(json!({
        "types": {
            "Mail": [{"name": "from", "type": "Person"}]
        },
        "primaryType": "Mail",
        "domain": {},
        "message": {"from": {}}
    }))
    .unwrap();

    // the domain root itself is undeclared here
    let err = message_frames::<String>(&keychain, &data, None).unwrap_err();
    assert!(matches!(err, Error::UnknownStruct(name) if name == "EIP712Domain"));
}

fn permit_message() -> TypedData {
    serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Permit": [
                {"name": "value", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ]
        },
        "primaryType": "Permit",
        "domain": {
            "name": "Token",
            "chainId": 1,
            "verifyingContract": "0x4444444444444444444444444444444444444444"
        },
        "message": {"value": "0x2710", "deadline": 1700000000}
    }))
    .unwrap()
}

fn permit_filters() -> MessageFilters {
    serde_json::from_value(json!({
        "name": "Permit",
        "tokens": [{
            "addr": "0x4444444444444444444444444444444444444444",
            "ticker": "TST",
            "decimals": 18,
            "chain_id": 1
        }],
        "fields": {
            "value": {"type": "amount_join_value", "name": "Amount", "token": 0},
            "deadline": {"type": "datetime", "name": "Deadline"}
        }
    }))
    .unwrap()
}

#[test]
fn filtering_frame_order() {
    init_logging();
    let keychain = test_keychain();

    let frames =
        message_frames::<String>(&keychain, &permit_message(), Some(&permit_filters())).unwrap();

    let kinds: Vec<(u8, u8)> = frames.iter().map(|f| (f.ins, f.p2)).collect();
    let def = Instruction::Eip712SendStructDef as u8;
    let imp = Instruction::Eip712SendStructImpl as u8;
    let flt = Instruction::Eip712SendFiltering as u8;
    let tok = Instruction::ProvideErc20TokenInformation as u8;

    assert_eq!(
        kinds,
        vec![
            // definitions: EIP712Domain (3 fields), Permit (2 fields)
            (def, p2::STRUCT_NAME),
            (def, p2::STRUCT_FIELD),
            (def, p2::STRUCT_FIELD),
            (def, p2::STRUCT_FIELD),
            (def, p2::STRUCT_NAME),
            (def, p2::STRUCT_FIELD),
            (def, p2::STRUCT_FIELD),
            // activation strictly before any implementation data
            (flt, p2::FILTERING_ACTIVATE),
            // domain implementation
            (imp, p2::STRUCT_NAME),
            (imp, p2::STRUCT_FIELD),
            (imp, p2::STRUCT_FIELD),
            (imp, p2::STRUCT_FIELD),
            // message info between domain and message
            (flt, p2::FILTERING_MESSAGE_INFO),
            // message implementation: token metadata + filter ride ahead of
            // each filtered value frame
            (imp, p2::STRUCT_NAME),
            (tok, 0x00),
            (flt, p2::FILTERING_AMOUNT_FIELD),
            (imp, p2::STRUCT_FIELD),
            (flt, p2::FILTERING_DATETIME),
            (imp, p2::STRUCT_FIELD),
        ]
    );

    // message info carries the display name and filter count
    let info = &frames[12].data;
    assert_eq!(info[0] as usize, "Permit".len());
    assert_eq!(&info[1..7], b"Permit");
    assert_eq!(info[7], 2);
}

#[test]
fn token_metadata_is_sent_once() {
    let keychain = test_keychain();
    let mut filters = permit_filters();
    // both fields join against the same token entry
    filters.fields = serde_json::from_value(json!({
        "value": {"type": "amount_join_value", "name": "Amount", "token": 0},
        "deadline": {"type": "amount_join_token", "token": 0}
    }))
    .unwrap();

    let frames = message_frames::<String>(&keychain, &permit_message(), Some(&filters)).unwrap();
    let token_frames = frames
        .iter()
        .filter(|f| f.ins == Instruction::ProvideErc20TokenInformation as u8)
        .count();
    assert_eq!(token_frames, 1);
}

#[test]
fn empty_array_discards_filter_paths() {
    let keychain = test_keychain();
    let data: TypedData = serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [{"name": "chainId", "type": "uint256"}],
            "Batch": [{"name": "ids", "type": "uint8[]"}]
        },
        "primaryType": "Batch",
        "domain": {"chainId": 1},
        "message": {"ids": []}
    }))
    .unwrap();
    let filters: MessageFilters = serde_json::from_value(json!({
        "name": "Batch",
        "fields": {
            "ids.[]": {"type": "raw", "name": "Id"}
        }
    }))
    .unwrap();

    let frames = message_frames::<String>(&keychain, &data, Some(&filters)).unwrap();

    // array frame announcing zero elements
    let array_frame = frames
        .iter()
        .find(|f| f.p2 == p2::ARRAY && f.ins == Instruction::Eip712SendStructImpl as u8)
        .unwrap();
    assert_eq!(array_frame.data, vec![0]);

    // the declared path still gets its acknowledgement, discarded
    let discard = frames
        .iter()
        .find(|f| f.p2 == p2::FILTERING_DISCARDED_PATH)
        .unwrap();
    assert_eq!(discard.data[0] as usize, "ids.[]".len());
    assert_eq!(&discard.data[1..7], b"ids.[]");

    let raw = frames
        .iter()
        .find(|f| f.p2 == p2::FILTERING_RAW)
        .unwrap();
    assert_eq!(raw.p1, 1, "discarded flag rides p1");
}

#[tokio::test]
async fn sign_typed_data_round_trip() {
    init_logging();
    let keychain = test_keychain();

    let mut handle = DeviceHandle::from(MockExchange::acknowledging());
    let signature = handle
        .sign_typed_data(&keychain, &derivation_path(), &minimal_message(), None)
        .await
        .unwrap();
    assert_eq!(signature.v, 0x1b);

    let mock = handle.into_inner();
    assert_eq!(mock.sent.len(), 9);
    assert_eq!(mock.sent.last().unwrap().ins, Instruction::Eip712Sign as u8);
}

#[tokio::test]
async fn user_rejection_stops_the_stream() {
    let keychain = test_keychain();

    // first frame is refused
    let mut handle = DeviceHandle::from(MockExchange::scripted([(0x6985, vec![])]));
    let err = handle
        .sign_typed_data(&keychain, &derivation_path(), &minimal_message(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserRejected));

    let mock = handle.into_inner();
    assert_eq!(mock.sent.len(), 1, "no frame may follow a rejection");
}
