use crate::e2e::helpers;

use helpers::fake_minitwit::{Dialect, Fault, FakeMiniTwit};
use helpers::TestContext;
use minitwit_acceptance::domain::phrases::Phrasebook;
use minitwit_acceptance::domain::scenarios::{functional, DEFAULT_PASSWORD};
use minitwit_acceptance::infrastructure::http::MiniTwitClient;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_pass_message_recording_scenario(ctx: &TestContext) {
    functional::message_recording(&ctx.client, &ctx.users)
        .await
        .unwrap();

    let page = ctx.client.public_timeline().await.unwrap();
    assert!(page.contains("&lt;test message 2&gt;"));
}

#[tokio::test]
async fn it_should_accept_markup_rendered_verbatim() {
    let ctx = TestContext::serve(FakeMiniTwit::with_faults(
        Dialect::Go,
        &[Fault::UnescapedMessages],
    ))
    .await
    .unwrap();

    functional::message_recording(&ctx.client, &ctx.users)
        .await
        .unwrap();

    let page = ctx.client.public_timeline().await.unwrap();
    assert!(page.contains("<test message 2>"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_skip_confirmation_check_for_empty_message(ctx: &TestContext) {
    let (_, session) = ctx
        .client
        .register_and_login("frank", DEFAULT_PASSWORD)
        .await
        .unwrap();

    let page = session.add_message("").await.unwrap();

    assert!(!page.mentions_any(&ctx.client.phrasebook().message_recorded));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_when_confirmation_wording_differs(ctx: &TestContext) {
    let book = Phrasebook::from_json(r#"{ "message_recorded": { "exact": ["Tweet posted"] } }"#)
        .unwrap();
    let client = MiniTwitClient::new(&ctx.base_url, book).unwrap();

    let (_, session) = client
        .register_and_login("grace", DEFAULT_PASSWORD)
        .await
        .unwrap();
    let err = session.add_message("hello").await.unwrap_err();

    assert!(err.is_assertion());
    assert!(err.to_string().contains("Tweet posted"));
}
