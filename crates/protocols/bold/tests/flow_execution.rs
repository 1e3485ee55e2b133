//! End-to-end flow runs: request -> definition -> session over the mock chain

use bold::constants::DECIMAL_PRECISION;
use bold::{definition_for, EarnDepositRequest, Protocol, StakeRequest, TxRequest};
use bold_core::{Address, BranchContract, BranchId, ProtocolContract, U256};
use evm_client::mock::MockChain;
use tx_flow::{FlowStatus, StepStatus, TxSession};

fn account() -> Address {
    Address::with_last_byte(0xee)
}

fn e18(n: u64) -> U256 {
    U256::from(n) * DECIMAL_PRECISION
}

fn deposit_request() -> TxRequest {
    TxRequest::EarnDeposit(EarnDepositRequest {
        account: account(),
        branch: BranchId::new(1).unwrap(),
        amount: e18(250),
    })
}

async fn wait_until_confirming(session: &TxSession, step_id: &str) {
    let mut updates = session.subscribe();
    updates
        .wait_for(|snapshot| {
            snapshot.flow.as_ref().is_some_and(|flow| {
                flow.steps
                    .get(flow.current_step_index)
                    .is_some_and(|s| s.id == step_id && s.status == StepStatus::Confirming)
            })
        })
        .await
        .unwrap();
}

fn setup_deposit() -> (MockChain, Protocol, TxSession) {
    let mock = MockChain::new();
    let protocol = Protocol::new(mock.client());
    let bold = protocol
        .registry()
        .protocol_contract(ProtocolContract::BoldToken)
        .address;
    mock.set_read(bold, "allowance", U256::ZERO);
    let session = TxSession::new(mock.client());
    (mock, protocol, session)
}

#[tokio::test]
async fn deposit_runs_approval_then_deposit() {
    let (mock, protocol, session) = setup_deposit();

    let definition = definition_for(&protocol, deposit_request());
    let status = session.start_flow(definition.as_ref()).await;
    assert_eq!(status, FlowStatus::Success);

    let flow = session.flow().unwrap();
    assert_eq!(flow.id, "earnDeposit");
    assert_eq!(flow.steps.len(), 2);
    assert!(flow.steps.iter().all(|s| s.status == StepStatus::Success));
    assert!(flow.steps.iter().all(|s| s.tx_hash.is_some()));
    assert_eq!(
        flow.success_message.as_deref(),
        Some("Successfully deposited BOLD to WSTETH Stability Pool")
    );
    assert_eq!(session.progress(), 1.0);

    assert_eq!(mock.submitted_functions(), vec!["approve", "provideToSP"]);
    let pool = protocol
        .registry()
        .branch_contract(BranchId::new(1).unwrap(), BranchContract::StabilityPool);
    assert_eq!(mock.submissions()[1].address(), pool.address);
    assert_eq!(mock.confirmed().len(), 2);
}

#[tokio::test]
async fn failed_second_step_keeps_first_and_resumes() {
    let (mock, protocol, session) = setup_deposit();
    mock.fail_submission("provideToSP", "nonce too low");

    let definition = definition_for(&protocol, deposit_request());
    let status = session.start_flow(definition.as_ref()).await;
    assert_eq!(status, FlowStatus::Error);

    let flow = session.flow().unwrap();
    assert_eq!(flow.current_step_index, 1);
    assert_eq!(flow.steps[0].status, StepStatus::Success);
    assert_eq!(flow.steps[1].status, StepStatus::Error);
    assert_eq!(flow.error.as_ref().unwrap().name, "submission_rejected");

    // The approval is not submitted again
    mock.clear_submission_failure("provideToSP");
    session.clear_error().unwrap();
    let status = session.resume(1).await.unwrap();
    assert_eq!(status, FlowStatus::Success);
    assert_eq!(mock.submitted_functions(), vec!["approve", "provideToSP"]);
}

#[tokio::test]
async fn reverted_approval_keeps_hash_and_stops_flow() {
    let (mock, protocol, session) = setup_deposit();
    mock.revert_on("approve");

    let status = session
        .start_flow(definition_for(&protocol, deposit_request()).as_ref())
        .await;
    assert_eq!(status, FlowStatus::Error);

    let flow = session.flow().unwrap();
    assert_eq!(flow.current_step_index, 0);
    assert_eq!(flow.steps[0].status, StepStatus::Error);
    assert_eq!(flow.steps[0].tx_hash, Some(mock.confirmed()[0]));
    assert_eq!(flow.error.unwrap().name, "reverted");
    assert_eq!(flow.steps[1].status, StepStatus::Idle);
    assert_eq!(mock.submitted_functions(), vec!["approve"]);
}

#[tokio::test]
async fn approval_confirmation_wait_can_be_cancelled() {
    let (mock, protocol, session) = setup_deposit();
    mock.hold_confirmations();

    let definition = definition_for(&protocol, deposit_request());
    let runner = session.clone();
    let handle = tokio::spawn(async move { runner.start_flow(definition.as_ref()).await });

    wait_until_confirming(&session, "approve").await;
    let step = session.current_step().unwrap();
    assert!(step.tx_hash.is_some());
    assert!(session.cancel_confirmation_wait());
    assert_eq!(handle.await.unwrap(), FlowStatus::Error);

    let step = session.current_step().unwrap();
    assert_eq!(step.id, "approve");
    assert!(step.tx_hash.is_some());
    assert_eq!(step.error.unwrap().name, "confirmation_cancelled");
    assert_eq!(mock.submitted_functions(), vec!["approve"]);
}

#[tokio::test]
async fn build_failure_publishes_error_without_steps() {
    let mock = MockChain::new();
    let protocol = Protocol::new(mock.client());
    let governance = protocol
        .registry()
        .protocol_contract(ProtocolContract::Governance)
        .address;
    mock.fail_read(governance, "deriveUserProxyAddress", "node unavailable");
    let session = TxSession::new(mock.client());

    let request = TxRequest::Stake(StakeRequest {
        account: account(),
        amount: e18(1),
    });
    let status = session
        .start_flow(definition_for(&protocol, request).as_ref())
        .await;
    assert_eq!(status, FlowStatus::Error);

    let flow = session.flow().unwrap();
    assert_eq!(flow.id, "stakeLqty");
    assert!(flow.steps.is_empty());
    assert_eq!(flow.error.unwrap().name, "read_failed");
    assert!(mock.submissions().is_empty());
}

#[tokio::test]
async fn close_hides_and_dismiss_discards() {
    let (_mock, protocol, session) = setup_deposit();
    session
        .start_flow(definition_for(&protocol, deposit_request()).as_ref())
        .await;

    session.close();
    assert!(!session.is_open());
    assert!(session.flow().is_some());

    session.dismiss();
    let snapshot = session.snapshot();
    assert!(snapshot.flow.is_none());
    assert!(!snapshot.is_open);
}
