//! Payment intent creation, confirmation, and the success display.

#![allow(clippy::unwrap_used)]

use driftwood_integration_tests::{TestHarness, endpoints};
use reqwest::StatusCode;

#[tokio::test]
async fn non_positive_amounts_never_request_an_intent() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    for amount in ["0", "-5", ""] {
        let body = client
            .get(harness.url(&format!("/checkout/payment?amount={amount}")))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(body.contains("No payment is due."));
        assert!(!body.contains("payment-form"));
    }

    assert_eq!(harness.calls.count(endpoints::STRIPE_CREATE_INTENT), 0);
}

#[tokio::test]
async fn intents_are_requested_in_minor_units() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    let body = client
        .get(harness.url("/checkout/payment?amount=12.50"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // $12.50 goes over the wire as 1250 cents.
    let intent_body = harness
        .calls
        .first_body(endpoints::STRIPE_CREATE_INTENT)
        .unwrap();
    assert!(intent_body.contains("amount=1250"));

    // The page binds the form to the returned intent.
    assert!(body.contains("payment-form"));
    assert!(body.contains("pi_test_1_secret_abc"));
    assert!(body.contains("Pay $12.50"));
}

#[tokio::test]
async fn failed_intent_creation_shows_the_exact_message_and_no_form() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    harness
        .fail_intents
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let body = client
        .get(harness.url("/checkout/payment?amount=50.00"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Failed to initialize payment."));
    assert!(!body.contains("payment-form"));
    assert_eq!(harness.calls.count(endpoints::STRIPE_CREATE_INTENT), 1);
}

#[tokio::test]
async fn confirmation_success_redirects_to_the_success_display() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    let response = client
        .post(harness.url("/checkout/payment/confirm"))
        .form(&[
            ("amount", "240.00"),
            ("intent_id", "pi_test_1"),
            ("client_secret", "pi_test_1_secret_abc"),
            ("payment_method", "pm_card_test"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert_eq!(location, "/checkout/payment/success?amount=240.00");

    // The provider saw the payment-method token and an absolute return URL.
    let confirm_body = harness
        .calls
        .first_body(endpoints::STRIPE_CONFIRM_INTENT)
        .unwrap();
    assert!(confirm_body.contains("payment_method=pm_card_test"));
    assert!(confirm_body.contains("return_url="));

    let success_page = client
        .get(harness.url(&location))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(success_page.contains("Payment Successful"));
    assert!(success_page.contains("Amount: 240.00"));
}

#[tokio::test]
async fn declined_confirmation_shows_the_provider_message_verbatim_and_keeps_the_form() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    harness.decline_payments_with("Your card was declined.");

    let response = client
        .post(harness.url("/checkout/payment/confirm"))
        .form(&[
            ("amount", "50.00"),
            ("intent_id", "pi_test_1"),
            ("client_secret", "pi_test_1_secret_abc"),
            ("payment_method", "pm_card_test"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    // Verbatim provider wording, with the form still rendered against the
    // same intent so the customer can retry.
    assert!(body.contains("Your card was declined."));
    assert!(body.contains("payment-form"));
    assert!(body.contains("pi_test_1_secret_abc"));
}

#[tokio::test]
async fn submitting_before_the_elements_load_never_reaches_the_provider() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    // No payment_method field: the provider elements never produced a token.
    let response = client
        .post(harness.url("/checkout/payment/confirm"))
        .form(&[
            ("amount", "50.00"),
            ("intent_id", "pi_test_1"),
            ("client_secret", "pi_test_1_secret_abc"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("The payment form has not finished loading. Please try again."));
    assert!(body.contains("payment-form"));

    assert_eq!(harness.calls.count(endpoints::STRIPE_CONFIRM_INTENT), 0);
}

#[tokio::test]
async fn success_display_defaults_to_zero_for_absent_or_malformed_amounts() {
    let harness = TestHarness::spawn().await;
    let client = harness.client();

    for path in [
        "/checkout/payment/success",
        "/checkout/payment/success?amount=not-a-number",
    ] {
        let body = client
            .get(harness.url(path))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Payment Successful"));
        assert!(body.contains("Amount: 0"));
    }
}
