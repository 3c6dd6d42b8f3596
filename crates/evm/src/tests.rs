#[cfg(test)]
mod tests {
    use crate::{
        call::{contract_address, CallDispatcher, CallOutcome, CallParams},
        execution::{BlockContext, CallKind, ExecutionResult, HaltReason},
        executive::TransactionExecutor,
        opcodes::Opcode,
        precompiled::PrecompiledRegistry,
        schedule::Schedule,
        state::{Account, AccountState, MemoryState},
    };
    use ethereum_core::{Receipt, Transaction};
    use ethereum_crypto::{secret_from_slice, secret_to_address};
    use ethereum_types::{Address, Bytes, HashExt, H256, U256};
    use proptest::prelude::*;

    const SENDER: u64 = 0x5e4d;
    const CALLER: u64 = 0xca11;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn slot(n: u64) -> H256 {
        H256::from_low_u64_be(n)
    }

    struct Harness {
        schedule: Schedule,
        precompiles: PrecompiledRegistry,
        block: BlockContext,
        state: MemoryState,
    }

    impl Harness {
        fn new(schedule: Schedule) -> Self {
            let mut state = MemoryState::new();
            state.insert_account(addr(SENDER), Account::with_balance(U256::from(10_000_000_000u64)));
            state.insert_account(addr(CALLER), Account::with_balance(U256::from(1_000)));
            Harness {
                schedule,
                precompiles: PrecompiledRegistry::frontier(),
                block: BlockContext {
                    coinbase: addr(0xc0ffee),
                    number: 1,
                    gas_limit: 10_000_000,
                    ..Default::default()
                },
                state,
            }
        }

        fn deploy(&mut self, address: Address, code: &[u8]) {
            self.state.insert_account(
                address,
                Account {
                    code: Bytes::from_slice(code),
                    ..Default::default()
                },
            );
        }

        /// Runs `address`'s code as a message call from `CALLER`.
        fn call(&mut self, address: Address, value: u64, gas: u64, depth: usize) -> CallOutcome {
            let mut dispatcher = CallDispatcher::new(
                &mut self.state,
                &self.schedule,
                &self.block,
                &self.precompiles,
                addr(CALLER),
                U256::one(),
            );
            dispatcher
                .call(CallParams {
                    kind: CallKind::Call,
                    caller: addr(CALLER),
                    address,
                    code_address: address,
                    value: U256::from(value),
                    transfer: true,
                    data: Bytes::new(),
                    gas,
                    depth,
                })
                .unwrap()
        }

        fn transact(&mut self, to: Option<Address>, data: &[u8], gas_limit: u64) -> (Receipt, ExecutionResult) {
            let nonce = self.state.nonce(&addr(SENDER));
            let tx = Transaction {
                nonce,
                gas_price: U256::one(),
                gas_limit: U256::from(gas_limit),
                to,
                value: U256::zero(),
                data: Bytes::from_slice(data),
                v: 0,
                r: U256::zero(),
                s: U256::zero(),
            };
            TransactionExecutor::new(&mut self.state, &self.schedule, &self.precompiles)
                .execute_from(addr(SENDER), &tx, &self.block)
                .unwrap()
        }

        fn sender_balance(&self) -> U256 {
            self.state.balance(&addr(SENDER))
        }
    }

    #[test]
    fn test_simple_value_transfer_costs_21000() {
        let mut harness = Harness::new(Schedule::frontier());
        let secret = secret_from_slice(&[0x33; 32]).unwrap();
        let sender = secret_to_address(&secret);
        let recipient = addr(0xbeef);
        harness.state.insert_account(sender, Account::with_balance(U256::from(1_000_000)));

        let tx = Transaction {
            nonce: U256::zero(),
            gas_price: U256::from(2),
            gas_limit: U256::from(21000),
            to: Some(recipient),
            value: U256::from(1000),
            data: Bytes::new(),
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        }
        .sign(&secret, None)
        .unwrap();

        let (receipt, result) = TransactionExecutor::new(&mut harness.state, &harness.schedule, &harness.precompiles)
            .execute(&tx, &harness.block)
            .unwrap();

        assert!(receipt.is_success());
        assert_eq!(receipt.gas_used(), 21000);
        assert_eq!(receipt.cumulative_gas_used(), 21000);
        assert!(receipt.logs().is_empty());
        assert_eq!(result.refund, 0);
        assert_eq!(harness.state.balance(&sender), U256::from(1_000_000 - 1000 - 42000));
        assert_eq!(harness.state.balance(&recipient), U256::from(1000));
        assert_eq!(harness.state.balance(&addr(0xc0ffee)), U256::from(42000));
        assert_eq!(harness.state.nonce(&sender), U256::one());
        assert_eq!(receipt.post_state(), harness.state.state_root());
    }

    #[test]
    fn test_oversized_create_fails_and_consumes_all_gas() {
        let mut harness = Harness::new(Schedule::spurious_dragon(1));
        let expected = contract_address(&addr(SENDER), &U256::zero());
        let before = harness.sender_balance();

        // PUSH2 0x6001, PUSH1 0, RETURN: 24577 zero bytes of code
        let (receipt, result) = harness.transact(None, &[0x61, 0x60, 0x01, 0x60, 0x00, 0xf3], 200_000);

        assert_eq!(result.exception, Some(HaltReason::CodeSizeExceeded));
        assert_eq!(receipt.gas_used(), 200_000);
        assert_eq!(receipt.error(), "contract code size exceeded");
        assert_eq!(receipt.contract_address(), None);
        assert!(!harness.state.exists(&expected));
        assert_eq!(harness.state.nonce(&addr(SENDER)), U256::one());
        assert_eq!(harness.sender_balance(), before - U256::from(200_000));
    }

    #[test]
    fn test_create_at_size_limit_succeeds() {
        let mut harness = Harness::new(Schedule::spurious_dragon(1));
        let expected = contract_address(&addr(SENDER), &U256::zero());

        // PUSH2 0x6000, PUSH1 0, RETURN: exactly 24576 bytes
        let (receipt, result) = harness.transact(None, &[0x61, 0x60, 0x00, 0x60, 0x00, 0xf3], 5_000_000);

        assert!(result.is_success());
        assert_eq!(receipt.contract_address(), Some(expected));
        assert_eq!(harness.state.code(&expected).len(), 24576);
        assert_eq!(harness.state.nonce(&expected), U256::one());
        // intrinsic 53280, execution 3462, deposit 200 per byte
        assert_eq!(receipt.gas_used(), 53280 + 3462 + 200 * 24576);
    }

    #[test]
    fn test_code_deposit_out_of_gas_by_fork() {
        // PUSH1 0x20, PUSH1 0, RETURN: 32 bytes of code, 6400 gas to deposit
        let init = [0x60, 0x20, 0x60, 0x00, 0xf3];
        // intrinsic 21000 + 4 * 68 + 4, execution 3 + 3 + 3
        let gas_limit = 21276 + 9 + 6399;

        let mut frontier = Harness::new(Schedule::frontier());
        let (_, result) = frontier.transact(None, &init, gas_limit);
        let created = result.contract_address.unwrap();
        assert!(result.is_success());
        assert!(frontier.state.code(&created).is_empty());
        assert!(frontier.state.exists(&created));

        let mut homestead = Harness::new(Schedule::homestead());
        let (_, result) = homestead.transact(None, &init, gas_limit + 32000);
        assert_eq!(result.exception, Some(HaltReason::OutOfGas));
        assert_eq!(result.contract_address, None);
    }

    #[test]
    fn test_inner_out_of_gas_does_not_abort_caller() {
        let mut harness = Harness::new(Schedule::frontier());
        let outer = addr(0xaa);
        let inner = addr(0xbb);
        harness.deploy(
            outer,
            &[
                0x60, 0x00, // PUSH1 0 (out len)
                0x60, 0x00, // PUSH1 0 (out offset)
                0x60, 0x00, // PUSH1 0 (in len)
                0x60, 0x00, // PUSH1 0 (in offset)
                0x60, 0x00, // PUSH1 0 (value)
                0x60, 0xbb, // PUSH1 0xbb
                0x61, 0x75, 0x30, // PUSH2 30000
                0xf1, // CALL
                0x60, 0x00, 0x55, // SSTORE(0, success)
                0x60, 0x01, 0x60, 0x01, 0x55, // SSTORE(1, 1)
                0x00,
            ],
        );
        harness.deploy(
            inner,
            &[
                0x60, 0x01, 0x60, 0x00, 0x55, // SSTORE(0, 1)
                0x5b, 0x60, 0x05, 0x56, // loop forever
            ],
        );

        let (receipt, result) = harness.transact(Some(outer), &[], 100_000);

        assert!(receipt.is_success());
        assert_eq!(harness.state.storage_at(&outer, &slot(0)), H256::zero());
        assert_eq!(harness.state.storage_at(&outer, &slot(1)), slot(1));
        assert_eq!(harness.state.storage_at(&inner, &slot(0)), H256::zero());
        // 21000 + pushes 21 + CALL 40 + 30000 forwarded + SSTOREs 5000 and 20000
        assert_eq!(receipt.gas_used(), 21000 + 21 + 30040 + 3 + 5000 + 6 + 20000);

        let call = &result.internal_calls[0];
        assert_eq!(call.kind, CallKind::Call);
        assert_eq!(call.to, inner);
        assert_eq!(call.error, Some(HaltReason::OutOfGas));
        assert_eq!(call.gas, 30000);
        assert_eq!(call.gas_used, 30000);
    }

    #[test]
    fn test_sstore_set_then_clear_refund() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0xcc);
        harness.deploy(
            contract,
            &[
                0x60, 0x01, 0x60, 0x00, 0x55, // SSTORE(0, 1)
                0x60, 0x00, 0x60, 0x00, 0x55, // SSTORE(0, 0)
                0x00,
            ],
        );
        let before = harness.sender_balance();

        let (receipt, result) = harness.transact(Some(contract), &[], 100_000);

        assert_eq!(result.gas_used, 46012);
        assert_eq!(result.refund_counter, 15000);
        assert_eq!(result.refund, 15000);
        assert_eq!(receipt.gas_used(), 31012);
        assert_eq!(harness.sender_balance(), before - U256::from(31012));
        assert_eq!(harness.state.storage_at(&contract, &slot(0)), H256::zero());
    }

    #[test]
    fn test_refund_capped_at_half_of_gas_used() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0xcd);
        harness.state.insert_account(
            contract,
            Account {
                code: Bytes::from_slice(&[
                    0x60, 0x00, 0x60, 0x00, 0x55, // SSTORE(0, 0)
                    0x60, 0x00, 0x60, 0x01, 0x55, // SSTORE(1, 0)
                    0x00,
                ]),
                storage: [(slot(0), slot(1)), (slot(1), slot(1))].into_iter().collect(),
                ..Default::default()
            },
        );

        let (receipt, result) = harness.transact(Some(contract), &[], 100_000);

        assert_eq!(result.gas_used, 31012);
        assert_eq!(result.refund_counter, 30000);
        assert_eq!(result.refund, 15506);
        assert_eq!(receipt.gas_used(), 15506);
    }

    #[test]
    fn test_suicide_moves_balance_and_refunds() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0xdd);
        let beneficiary = addr(0xee);
        harness.state.insert_account(
            contract,
            Account {
                balance: U256::from(500),
                code: Bytes::from_slice(&[0x60, 0xee, 0xff]),
                ..Default::default()
            },
        );

        let (receipt, result) = harness.transact(Some(contract), &[], 50_000);

        assert!(result.suicides.contains(&contract));
        assert!(!harness.state.exists(&contract));
        assert_eq!(harness.state.balance(&beneficiary), U256::from(500));
        assert_eq!(result.gas_used, 21003);
        assert_eq!(result.refund, 10501);
        assert_eq!(receipt.gas_used(), 10502);
    }

    #[test]
    fn test_log_reaches_receipt_bloom() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0x106);
        // LOG1 with topic 0x2a and no data
        harness.deploy(contract, &[0x60, 0x2a, 0x60, 0x00, 0x60, 0x00, 0xa1, 0x00]);

        let (receipt, _) = harness.transact(Some(contract), &[], 50_000);

        let log = &receipt.logs()[0];
        assert_eq!(log.address, contract);
        assert_eq!(log.topics, vec![slot(0x2a)]);
        assert!(log.data.is_empty());
        assert!(receipt.logs_bloom().contains_input(contract.as_bytes()));
        assert!(receipt.logs_bloom().contains_input(slot(0x2a).as_bytes()));
        assert_eq!(receipt.gas_used(), 21000 + 9 + 375 + 375);
    }

    #[test]
    fn test_every_opcode_underflows_on_empty_stack() {
        let mut harness = Harness::new(Schedule::homestead());
        for byte in 0..=u8::MAX {
            let Some(opcode) = Opcode::from_u8(byte) else {
                continue;
            };
            if opcode.info().stack_in == 0 {
                continue;
            }
            let contract = addr(0x1000 + byte as u64);
            harness.deploy(contract, &[byte]);
            let outcome = harness.call(contract, 0, 10_000, 0);
            assert_eq!(outcome.result, Err(HaltReason::StackUnderflow), "{}", opcode);
            assert_eq!(outcome.gas_left, 0, "{}", opcode);
        }
    }

    #[test]
    fn test_memory_expansion_is_billed() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0x3e3);
        harness.deploy(
            contract,
            &[
                0x60, 0xff, 0x61, 0x04, 0x00, 0x52, // MSTORE(1024, 0xff)
                0x59, 0x60, 0x00, 0x52, // MSTORE(0, MSIZE)
                0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN(0, 32)
            ],
        );

        let outcome = harness.call(contract, 0, 1000, 0);

        let output = outcome.result.unwrap();
        assert_eq!(U256::from_big_endian(&output), U256::from(1056));
        // 33 words cost 3 * 33 + 33 * 33 / 512 = 101
        assert_eq!(outcome.gas_left, 1000 - (3 + 3 + 3 + 101 + 2 + 3 + 3 + 3 + 3));
    }

    #[test]
    fn test_memory_growth_past_gas_is_out_of_gas() {
        let mut harness = Harness::new(Schedule::frontier());
        let contract = addr(0x3e4);
        // MLOAD at offset 2^32
        harness.deploy(contract, &[0x64, 0x01, 0x00, 0x00, 0x00, 0x00, 0x51, 0x00]);

        let outcome = harness.call(contract, 0, 1_000_000, 0);
        assert_eq!(outcome.result, Err(HaltReason::OutOfGas));
        assert_eq!(outcome.gas_left, 0);
    }

    #[test]
    fn test_invalid_jump_and_opcode() {
        let mut harness = Harness::new(Schedule::frontier());
        // Jump into PUSH data that happens to be 0x5b.
        harness.deploy(addr(0x1a), &[0x60, 0x04, 0x56, 0x60, 0x5b]);
        harness.deploy(addr(0x1b), &[0xfe]);
        // DELEGATECALL is unknown before Homestead.
        harness.deploy(addr(0x1c), &[0xf4]);

        assert_eq!(harness.call(addr(0x1a), 0, 100, 0).result, Err(HaltReason::InvalidJump(4)));
        assert_eq!(harness.call(addr(0x1b), 0, 100, 0).result, Err(HaltReason::InvalidOpcode(0xfe)));
        assert_eq!(harness.call(addr(0x1c), 0, 100, 0).result, Err(HaltReason::InvalidOpcode(0xf4)));
    }

    #[test]
    fn test_call_depth_limit() {
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // zero args
            0x60, 0xbb, // PUSH1 0xbb
            0x61, 0x01, 0x00, // PUSH2 256
            0xf1, // CALL
            0x60, 0x00, 0x52, // MSTORE(0, success)
            0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN(0, 32)
        ];
        let mut harness = Harness::new(Schedule::frontier());
        harness.deploy(addr(0xaa), &code);
        harness.state.insert_account(addr(0xbb), Account::with_balance(U256::one()));

        let at_limit = harness.call(addr(0xaa), 0, 100_000, 1024);
        let below_limit = harness.call(addr(0xaa), 0, 100_000, 1023);

        assert_eq!(U256::from_big_endian(&at_limit.result.unwrap()), U256::zero());
        assert_eq!(U256::from_big_endian(&below_limit.result.unwrap()), U256::one());
        // A rejected call gets its forwarded gas back, same as an empty callee.
        assert_eq!(at_limit.gas_left, below_limit.gas_left);
        let rejected = &at_limit.substate.internal_calls;
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].error, Some(HaltReason::CallDepthExceeded));
        assert_eq!(rejected[0].gas_used, 0);
        assert_eq!(below_limit.substate.internal_calls.len(), 1);
        assert_eq!(below_limit.substate.internal_calls[0].error, None);
    }

    #[test]
    fn test_call_with_value_beyond_balance_is_rejected() {
        let mut harness = Harness::new(Schedule::frontier());
        harness.deploy(
            addr(0xaa),
            &[
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // zero ranges
                0x60, 0x05, // PUSH1 5 (value)
                0x60, 0xbb, 0x60, 0x00, 0xf1, // CALL(0, 0xbb, 5, ...)
                0x60, 0x00, 0x55, 0x00, // SSTORE(0, success)
            ],
        );
        harness.state.insert_account(addr(0xbb), Account::with_balance(U256::one()));

        let outcome = harness.call(addr(0xaa), 4, 100_000, 0);

        assert!(outcome.is_success());
        assert_eq!(harness.state.storage_at(&addr(0xaa), &slot(0)), H256::zero());
        assert_eq!(harness.state.balance(&addr(0xaa)), U256::from(4));
        assert_eq!(harness.state.balance(&addr(0xbb)), U256::one());
        let rejected = &outcome.substate.internal_calls[0];
        assert_eq!(rejected.error, Some(HaltReason::InsufficientBalance));
        assert_eq!(rejected.to, addr(0xbb));
    }

    #[test]
    fn test_rejected_value_call_returns_stipend() {
        let mut harness = Harness::new(Schedule::frontier());
        // No balance of its own: CALL(0, 0xbb, 1, 0, 0, 0, 0) to a missing account.
        harness.deploy(
            addr(0xaa),
            &[
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // zero ranges
                0x60, 0x01, // PUSH1 1 (value)
                0x60, 0xbb, // PUSH1 0xbb
                0x60, 0x00, // PUSH1 0 (gas)
                0xf1, 0x00, // CALL, STOP
            ],
        );

        let outcome = harness.call(addr(0xaa), 0, 100_000, 0);

        // 7 pushes at 3, CALL at 40 + 9000 value + 25000 new account, stipend back.
        assert!(outcome.is_success());
        assert_eq!(outcome.gas_left, 100_000 - 21 - 34_040 + 2_300);
        let rejected = &outcome.substate.internal_calls[0];
        assert_eq!(rejected.error, Some(HaltReason::InsufficientBalance));
        assert_eq!(rejected.gas, 2_300);
        assert!(!harness.state.exists(&addr(0xbb)));
    }

    #[test]
    fn test_invalid_jump_in_callee_fails_only_the_call() {
        let mut harness = Harness::new(Schedule::frontier());
        harness.deploy(addr(0x1a), &[0x60, 0x04, 0x56, 0x60, 0x5b]);
        harness.deploy(
            addr(0xaa),
            &[
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // zero ranges and value
                0x60, 0x1a, // PUSH1 0x1a
                0x61, 0x27, 0x10, // PUSH2 10000 (gas)
                0xf1, 0x50, // CALL, POP
                0x60, 0x2a, 0x60, 0x01, 0x55, 0x00, // SSTORE(1, 0x2a), STOP
            ],
        );

        let outcome = harness.call(addr(0xaa), 0, 100_000, 0);

        assert!(outcome.is_success());
        assert_eq!(harness.state.storage_at(&addr(0xaa), &slot(1)), slot(0x2a));
        let failed = &outcome.substate.internal_calls[0];
        assert_eq!(failed.error, Some(HaltReason::InvalidJump(4)));
        assert_eq!(failed.gas_used, 10_000);
    }

    #[test]
    fn test_invalid_jump_at_top_level_is_included() {
        let mut harness = Harness::new(Schedule::frontier());
        harness.deploy(addr(0x1a), &[0x60, 0x04, 0x56, 0x60, 0x5b]);
        let before = harness.sender_balance();

        let (receipt, result) = harness.transact(Some(addr(0x1a)), &[], 100_000);

        assert!(!receipt.is_success());
        assert_eq!(result.exception, Some(HaltReason::InvalidJump(4)));
        assert_eq!(receipt.gas_used(), 100_000);
        assert_eq!(harness.state.nonce(&addr(SENDER)), U256::one());
        assert_eq!(harness.sender_balance(), before - U256::from(100_000));
    }

    #[test]
    fn test_delegatecall_keeps_caller_and_value() {
        let mut harness = Harness::new(Schedule::homestead());
        let proxy = addr(0xaa);
        let library = addr(0xbb);
        harness.deploy(
            proxy,
            &[
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // zero ranges
                0x60, 0xbb, // PUSH1 0xbb
                0x61, 0xff, 0xff, // PUSH2 0xffff
                0xf4, // DELEGATECALL
                0x00,
            ],
        );
        harness.deploy(
            library,
            &[
                0x33, 0x60, 0x00, 0x55, // SSTORE(0, CALLER)
                0x34, 0x60, 0x01, 0x55, // SSTORE(1, CALLVALUE)
                0x00,
            ],
        );

        let outcome = harness.call(proxy, 7, 200_000, 0);

        assert!(outcome.is_success());
        assert_eq!(
            harness.state.storage_at(&proxy, &slot(0)),
            H256::from_word(addr(CALLER).to_word())
        );
        assert_eq!(harness.state.storage_at(&proxy, &slot(1)), slot(7));
        assert_eq!(harness.state.storage_at(&library, &slot(0)), H256::zero());
        assert_eq!(outcome.substate.internal_calls[0].kind, CallKind::DelegateCall);
    }

    #[test]
    fn test_create_from_contract() {
        let mut harness = Harness::new(Schedule::frontier());
        let factory = addr(0xfac);
        harness.deploy(
            factory,
            &[
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // CREATE(0, 0, 0)
                0xf0, 0x60, 0x00, 0x55, 0x00, // SSTORE(0, address)
            ],
        );

        let outcome = harness.call(factory, 0, 100_000, 0);

        let created = contract_address(&factory, &U256::zero());
        assert!(outcome.is_success());
        assert_eq!(
            harness.state.storage_at(&factory, &slot(0)),
            H256::from_word(created.to_word())
        );
        assert_eq!(harness.state.nonce(&factory), U256::one());
        assert!(harness.state.exists(&created));
        assert_eq!(outcome.substate.internal_calls[0].kind, CallKind::Create);
    }

    #[test]
    fn test_precompile_reached_through_call() {
        let mut harness = Harness::new(Schedule::frontier());
        harness.deploy(
            addr(0xaa),
            &[
                0x60, 0x20, 0x60, 0x00, // out: 32 bytes at 0
                0x60, 0x00, 0x60, 0x00, // in: empty
                0x60, 0x00, 0x60, 0x02, // value 0, SHA-256
                0x61, 0x01, 0x00, 0xf1, // CALL with 256 gas
                0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN(0, 32)
            ],
        );
        harness.state.insert_account(addr(2), Account::with_balance(U256::one()));

        let output = harness.call(addr(0xaa), 0, 100_000, 0).result.unwrap();
        assert_eq!(
            hex::encode(output.as_slice()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    proptest! {
        #[test]
        fn prop_execution_is_deterministic(code in proptest::collection::vec(any::<u8>(), 0..64)) {
            let run = || {
                let mut harness = Harness::new(Schedule::tangerine_whistle());
                harness.deploy(addr(0xaa), &code);
                let outcome = harness.call(addr(0xaa), 0, 100_000, 0);
                (outcome.result, outcome.gas_left, outcome.substate, harness.state.state_root())
            };
            prop_assert_eq!(run(), run());
        }

        #[test]
        fn prop_exceptional_halt_leaves_no_gas(code in proptest::collection::vec(any::<u8>(), 1..32)) {
            let mut harness = Harness::new(Schedule::tangerine_whistle());
            harness.deploy(addr(0xaa), &code);
            let root = harness.state.state_root();
            let outcome = harness.call(addr(0xaa), 0, 50_000, 0);
            if outcome.result.is_err() {
                prop_assert_eq!(outcome.gas_left, 0);
                prop_assert_eq!(harness.state.state_root(), root);
            } else {
                prop_assert!(outcome.gas_left <= 50_000);
            }
        }
    }
}
