// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn check_response_accepts_code_zero() {
    let body = json!({ "code": 0, "message": "", "objects": null });
    assert_eq!(check_response(body.clone()).unwrap(), body);
}

#[test]
fn check_response_maps_unauthorized_code() {
    let err = check_response(json!({ "code": 1, "message": "bad token" })).unwrap_err();
    assert!(err.is_auth_invalid());
}

#[test]
fn check_response_maps_other_codes_to_api_error() {
    let err = check_response(json!({ "code": 100, "message": "oops" })).unwrap_err();
    assert!(matches!(err, RemoteError::Api { code: 100, ref message } if message == "oops"));
}

#[yare::parameterized(
    missing_code = { json!({ "objects": null }) },
    string_code  = { json!({ "code": "zero" }) },
)]
fn check_response_rejects_malformed(body: Value) {
    assert!(matches!(check_response(body), Err(RemoteError::Malformed(_))));
}

#[test]
fn credential_debug_hides_token() {
    let cred = Credential::new("s3cret");
    assert_eq!(format!("{cred:?}"), "Credential(***)");
    assert_eq!(cred.token(), "s3cret");
}

#[test]
fn http_client_builds_rest_endpoint() {
    let client = HttpRemoteClient::new("https://itop.example.com/", Duration::from_secs(5)).unwrap();
    assert_eq!(client.endpoint(), "https://itop.example.com/webservices/rest.php?version=1.3");
}

#[tokio::test]
async fn fake_routes_by_class_and_key() {
    let fake = FakeRemoteClient::new();
    fake.objects("Person", "id = 3", vec![("3".to_string(), json!({ "friendlyname": "Bob" }))]);
    fake.when("User", "", Err(RemoteError::Unavailable("down".to_string())));
    let cred = Credential::new("t");

    let person = fake
        .request(&cred, &json!({ "operation": "core/get", "class": "Person", "key": "SELECT Person WHERE id = 3" }))
        .await
        .unwrap();
    assert_eq!(person["objects"]["Person::3"]["fields"]["friendlyname"], "Bob");

    let user = fake.request(&cred, &json!({ "class": "User", "key": "SELECT User" })).await;
    assert!(matches!(user, Err(RemoteError::Unavailable(_))));

    let other = fake.request(&cred, &json!({ "class": "Team", "key": 1 })).await.unwrap();
    assert!(other["objects"].is_null());
    assert_eq!(fake.calls().len(), 3);
    assert_eq!(fake.calls_for("Person").len(), 1);
}
