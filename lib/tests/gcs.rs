// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Calldata schema tests: path vectors, instruction hash, transaction-info
//! records

use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use serde_json::json;

use ledger_eth::{
    apdu::{p1, tlv, Instruction},
    descriptor::Descriptor,
    gcs::{
        build_path, instruction_hash, AbiParam, ContainerPath, Field, LeafType, Param,
        PathElement, TxInfo, TypeFamily, Value,
    },
    keychain::Category,
    DeviceHandle,
};

mod helpers;
use helpers::{category_key, test_keychain, MockExchange};

fn abi_param(kind: &str) -> AbiParam {
    serde_json::from_value(json!({"name": "p", "type": kind})).unwrap()
}

#[test]
fn erc20_transfer_paths() {
    // transfer(address _to, uint256 _value)
    let to = build_path(&abi_param("address"), 0).unwrap();
    assert_eq!(
        to.elements(),
        &[PathElement::Tuple(0), PathElement::Leaf(LeafType::Static)]
    );

    let value = build_path(&abi_param("uint256"), 1).unwrap();
    assert_eq!(
        value.elements(),
        &[PathElement::Tuple(1), PathElement::Leaf(LeafType::Static)]
    );
}

#[test]
fn erc1155_batch_transfer_ids_path() {
    // safeBatchTransferFrom(address, address, uint256[] _ids, uint256[], bytes)
    let ids = build_path(&abi_param("uint256[]"), 2).unwrap();
    assert_eq!(
        ids.elements(),
        &[
            PathElement::Tuple(2),
            PathElement::Ref,
            PathElement::Array {
                weight: 1,
                start: None,
                end: None
            },
            PathElement::Leaf(LeafType::Static)
        ]
    );
}

fn transfer_fields() -> Vec<Field> {
    let to = build_path(&abi_param("address"), 0).unwrap();
    let value = build_path(&abi_param("uint256"), 1).unwrap();

    vec![
        Field::new(
            "To",
            Param::Raw {
                value: Value::calldata(TypeFamily::Address, to),
            },
        ),
        Field::new(
            "Amount",
            Param::TokenAmount {
                value: Value::calldata(TypeFamily::Uint, value).with_size(32),
                token: Some(Value::container(TypeFamily::Address, ContainerPath::To)),
                native_currencies: vec![],
                threshold: None,
                above_threshold_message: None,
            },
        ),
    ]
}

#[test]
fn instruction_hash_binds_field_order() {
    let fields = transfer_fields();
    let hash = instruction_hash(&fields);

    // stable across recomputation
    assert_eq!(hash, instruction_hash(&transfer_fields()));

    // order-sensitive
    let mut reversed = transfer_fields();
    reversed.reverse();
    assert_ne!(hash, instruction_hash(&reversed));

    // content-sensitive
    let mut renamed = transfer_fields();
    renamed[0] = Field::new(
        "Recipient",
        Param::Raw {
            value: Value::calldata(
                TypeFamily::Address,
                build_path(&abi_param("address"), 0).unwrap(),
            ),
        },
    );
    assert_ne!(hash, instruction_hash(&renamed));
}

#[test]
fn tx_info_record_layout_and_signature() {
    let keychain = test_keychain();
    let fields = transfer_fields();

    let info = TxInfo::new(
        1,
        1,
        [0xa0; 20],
        [0xa9, 0x05, 0x9c, 0xbb],
        instruction_hash(&fields),
        "transfer",
    )
    .with_contract_name("Test Token");

    let serialized = info.serialize(&keychain).unwrap();
    let records = tlv::decode(&serialized).unwrap();

    let tags: Vec<u64> = records.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        tags,
        vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x09, 0xff]
    );

    // the signature covers the record verbatim up to its own TLV
    let (_, sig_bytes) = records.last().unwrap();
    let body_len = serialized.len() - (3 + sig_bytes.len());
    let verifying = VerifyingKey::from(&category_key(Category::Cal));
    let signature = Signature::from_der(sig_bytes).unwrap();
    verifying
        .verify(&serialized[..body_len], &signature)
        .unwrap();

    // the same record serializes identically on every call
    assert_eq!(serialized, info.serialize(&keychain).unwrap());
}

#[test]
fn field_serialization_tags() {
    let fields = transfer_fields();
    let records = tlv::decode(&fields[0].serialize()).unwrap();
    let tags: Vec<u64> = records.iter().map(|(t, _)| *t).collect();
    // version, name, param type, param
    assert_eq!(tags, vec![0x00, 0x01, 0x02, 0x03]);
    assert_eq!(records[1].1, b"To".to_vec());
    assert_eq!(records[2].1, vec![0x00]); // raw param
}

#[tokio::test]
async fn transaction_info_and_fields_flow() {
    let keychain = test_keychain();
    let fields = transfer_fields();
    let info = TxInfo::new(
        1,
        1,
        [0xa0; 20],
        [0xa9, 0x05, 0x9c, 0xbb],
        instruction_hash(&fields),
        "transfer",
    );

    let mut handle = DeviceHandle::from(MockExchange::acknowledging());
    handle
        .provide_transaction_info(&keychain, &info)
        .await
        .unwrap();
    for field in &fields {
        handle.provide_field(field).await.unwrap();
    }

    let mock = handle.into_inner();
    assert_eq!(
        mock.sent[0].ins,
        Instruction::ProvideTransactionInfo as u8
    );
    assert_eq!(mock.sent[0].p1, p1::FIRST_CHUNK);
    assert!(mock
        .sent
        .iter()
        .skip(1)
        .all(|f| f.ins == Instruction::ProvideField as u8));
}
