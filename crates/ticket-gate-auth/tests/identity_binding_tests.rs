//! Integration tests for register, login, and unlock.

mod common;

use common::Fixture;
use ticket_gate_auth::{Credentials, RegistrationForm};
use ticket_gate_client::{GateError, GateTransport};
use ticket_gate_core::{Participant, ParticipantCode, ValidationError};
use ticket_gate_session::{SessionSlot, SessionStore};

fn registered_owner(handle: &str) -> Participant {
    Participant {
        code: ParticipantCode::from_number(1),
        handle: Some(handle.to_string()),
        has_credential: true,
    }
}

#[tokio::test]
async fn identity_binding_tests_register_promotes_ticket() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;

    let binding = fixture
        .binder
        .register(&ticket, &RegistrationForm::new("AbC", "abcd", "ABCD"))
        .await
        .expect("register should succeed");

    assert_eq!(binding.ticket, ticket);
    assert_eq!(binding.handle.as_deref(), Some("abc"));
    let snapshot = fixture.store.snapshot().expect("snapshot should work");
    assert_eq!(snapshot.my_ticket, Some(ticket.clone()));
    assert_eq!(snapshot.pending_ticket, None);

    let resolved = fixture
        .service
        .callback(&ticket)
        .await
        .expect("callback should succeed");
    assert!(resolved.has_password);
    assert_eq!(resolved.instagram_id.as_deref(), Some("abc"));
}

#[tokio::test]
async fn identity_binding_tests_short_password_never_reaches_network() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;

    let error = fixture
        .binder
        .register(&ticket, &RegistrationForm::new("abc", "ab", "ab"))
        .await
        .expect_err("register should fail locally");

    assert!(matches!(
        error,
        GateError::ValidationFailed(ValidationError::PasswordTooShort { .. })
    ));
    assert_eq!(fixture.service.calls().register, 0);
    assert_eq!(
        fixture.store.get(SessionSlot::PendingTicket).expect("read"),
        Some(ticket)
    );
}

#[tokio::test]
async fn identity_binding_tests_mixed_case_input_is_equivalent() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&ticket, &RegistrationForm::new("AbC", "PaSS", "pass"))
        .await
        .expect("register should succeed");

    let binding = fixture
        .binder
        .login(&Credentials::with_handle(" abc ", "pass"))
        .await
        .expect("lowercase login should match mixed-case registration");
    assert_ne!(binding.ticket, ticket);
}

#[tokio::test]
async fn identity_binding_tests_login_promotes_fresh_ticket() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&ticket, &RegistrationForm::new("abc", "abcd", "abcd"))
        .await
        .expect("register should succeed");

    let binding = fixture
        .binder
        .login(&Credentials::with_participant_code("0001", "ABCD"))
        .await
        .expect("legacy login should succeed");

    assert_ne!(binding.ticket, ticket);
    assert_eq!(binding.handle, None);
    assert_eq!(
        fixture.store.get(SessionSlot::MyTicket).expect("read"),
        Some(binding.ticket)
    );
}

#[tokio::test]
async fn identity_binding_tests_unlock_promotes_resolved_ticket() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&ticket, &RegistrationForm::new("abc", "abcd", "abcd"))
        .await
        .expect("register should succeed");
    fixture.store.clear_all().expect("clear should work");

    let binding = fixture
        .binder
        .unlock(
            &ticket,
            &registered_owner("abc"),
            &Credentials::with_handle("abc", "abcd"),
        )
        .await
        .expect("unlock should succeed");

    assert_eq!(binding.ticket, ticket);
    assert_eq!(
        fixture.store.get(SessionSlot::MyTicket).expect("read"),
        Some(ticket)
    );
}

#[tokio::test]
async fn identity_binding_tests_unlock_refuses_another_participants_account() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&ticket, &RegistrationForm::new("abc", "abcd", "abcd"))
        .await
        .expect("register should succeed");
    let other = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&other, &RegistrationForm::new("eve", "evepw", "evepw"))
        .await
        .expect("second register should succeed");
    fixture.store.clear_all().expect("clear should work");

    let error = fixture
        .binder
        .unlock(
            &ticket,
            &registered_owner("abc"),
            &Credentials::with_handle("eve", "evepw"),
        )
        .await
        .expect_err("unlock with another account should fail");

    assert!(matches!(error, GateError::ParticipantMismatch));
    assert_eq!(fixture.service.calls().login, 0);
    assert_eq!(fixture.store.get(SessionSlot::MyTicket).expect("read"), None);
}

#[tokio::test]
async fn identity_binding_tests_wrong_password_leaves_session_untouched() {
    let fixture = Fixture::new();
    let ticket = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&ticket, &RegistrationForm::new("abc", "abcd", "abcd"))
        .await
        .expect("register should succeed");
    fixture.store.clear_all().expect("clear should work");

    let error = fixture
        .binder
        .unlock(
            &ticket,
            &registered_owner("abc"),
            &Credentials::with_handle("abc", "wrong"),
        )
        .await
        .expect_err("unlock should fail");

    assert!(matches!(
        error,
        GateError::BackendRejected { ref reason, .. } if reason == "handle or password is incorrect"
    ));
    assert_eq!(fixture.store.get(SessionSlot::MyTicket).expect("read"), None);
}

#[tokio::test]
async fn identity_binding_tests_duplicate_handle_surfaces_backend_reason() {
    let fixture = Fixture::new();
    let first = fixture.pending_ticket().await;
    fixture
        .binder
        .register(&first, &RegistrationForm::new("abc", "abcd", "abcd"))
        .await
        .expect("register should succeed");
    let second = fixture.pending_ticket().await;

    let error = fixture
        .binder
        .register(&second, &RegistrationForm::new("ABC", "efgh", "efgh"))
        .await
        .expect_err("duplicate handle should be refused");

    assert_eq!(error.to_string(), "handle already in use");
    assert_eq!(
        fixture.store.get(SessionSlot::PendingTicket).expect("read"),
        Some(second)
    );
}
