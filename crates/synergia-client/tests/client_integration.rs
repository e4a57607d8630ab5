use synergia_client::{
    normalized_text, Client, Document, ElementRef, Endpoints, MappingSpec, SessionCookie,
    SynergiaError,
};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Helper: endpoints with every base pointed at the mock portal.
fn test_endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        portal_base_url: server.uri(),
        oauth_base_url: server.uri(),
        check_key_url: format!("{}/index.php?action=CSCheckKey", server.uri()),
    }
}

/// Helper: client against the mock portal with no seeded cookies.
fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .endpoints(test_endpoints(server))
        .build()
        .unwrap()
}

/// Matches requests whose Cookie header contains the given `key=value`
/// fragment, wherever the jar happened to place it.
struct HasCookie(&'static str);

impl wiremock::Match for HasCookie {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|cookies| cookies.contains(self.0))
    }
}

fn row_text(_: &Document, row: ElementRef<'_>) -> Option<String> {
    Some(normalized_text(row))
}

fn non_empty_row_text(_: &Document, row: ElementRef<'_>) -> Option<String> {
    let text = normalized_text(row);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[tokio::test]
async fn seeded_cookies_ride_requests_until_the_portal_overwrites_them() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uczen/index"))
        .and(HasCookie("TestCookie=1"))
        .and(HasCookie("DZIENNIKSID=before"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "DZIENNIKSID=after; Path=/")
                .set_body_string("<html></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiadomosci/5"))
        .and(HasCookie("DZIENNIKSID=after"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .endpoints(test_endpoints(&server))
        .cookies([SessionCookie::new("DZIENNIKSID", "before")])
        .build()
        .unwrap();

    client.get("uczen/index").await.unwrap();
    client.get("wiadomosci/5").await.unwrap();

    let snapshot = client.session_cookies();
    let sid = snapshot.iter().find(|c| c.key == "DZIENNIKSID").unwrap();
    assert_eq!(sid.value, "after");
    assert!(snapshot
        .iter()
        .any(|c| c.key == "TestCookie" && c.value == "1"));
}

#[tokio::test]
async fn mapping_an_unmatched_selector_yields_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/przegladaj_nb/uczen"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Brak danych do wyswietlenia</p></body></html>"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows = client
        .map_list(
            MappingSpec::get("przegladaj_nb/uczen", "table.decorated tbody tr"),
            row_text,
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn single_result_mapping_returns_the_first_listed_element() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <table class="decorated stretch"><tbody>
            <tr><td>pierwszy</td></tr>
            <tr><td>drugi</td></tr>
            <tr><td>trzeci</td></tr>
        </tbody></table>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/terminarz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let all = client
        .map_list(
            MappingSpec::get("terminarz", "table.decorated tbody tr"),
            row_text,
        )
        .await
        .unwrap();
    let first = client
        .map_first(
            MappingSpec::get("terminarz", "table.decorated tbody tr"),
            row_text,
        )
        .await
        .unwrap();

    assert_eq!(all, vec!["pierwszy", "drugi", "trzeci"]);
    assert_eq!(first.as_deref(), Some("pierwszy"));
}

#[tokio::test]
async fn parsers_that_decline_an_element_drop_it_from_the_list() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <table class="decorated"><tbody>
            <tr><td>widoczny</td></tr>
            <tr><td>   </td></tr>
            <tr><td>tez widoczny</td></tr>
        </tbody></table>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/przegladaj_nb/uczen"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows = client
        .map_list(
            MappingSpec::get("przegladaj_nb/uczen", "table.decorated tbody tr"),
            non_empty_row_text,
        )
        .await
        .unwrap();
    assert_eq!(rows, vec!["widoczny", "tez widoczny"]);
}

#[tokio::test]
async fn table_mapping_is_positional_over_the_wire() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <table class="decorated"><tbody>
            <tr><td>Przedmiot</td><td>Fizyka</td></tr>
            <tr><td>Nauczyciel</td><td>Anna Nowak</td></tr>
            <tr><td>Temat</td><td>Optyka</td></tr>
        </tbody></table>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/moje_zadania/podglad/17"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fields = client
        .map_table(
            MappingSpec::get("moje_zadania/podglad/17", "table.decorated"),
            &["subject", "teacher", "topic", "added", "due"],
        )
        .await
        .unwrap();

    assert_eq!(fields.len(), 3);
    assert_eq!(fields["subject"], "Fizyka");
    assert_eq!(fields["teacher"], "Anna Nowak");
    assert_eq!(fields["topic"], "Optyka");
    assert!(!fields.contains_key("added"));
    assert!(!fields.contains_key("due"));
}

#[tokio::test]
async fn post_specs_send_their_form_urlencoded() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <table class="decorated"><tbody><tr><td>zadanie</td></tr></tbody></table>
    </body></html>"#;
    Mock::given(method("POST"))
        .and(path("/moje_zadania"))
        .and(body_string_contains("dataOd=2024-01-01"))
        .and(body_string_contains("dataDo=2024-06-30"))
        .and(body_string_contains("przedmiot=-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let form = [
        ("dataOd", "2024-01-01"),
        ("dataDo", "2024-06-30"),
        ("przedmiot", "-1"),
    ];
    let rows = client
        .map_list(
            MappingSpec::post("moje_zadania", "table.decorated tbody tr", &form),
            row_text,
        )
        .await
        .unwrap();
    assert_eq!(rows, vec!["zadanie"]);
}

#[tokio::test]
async fn server_errors_surface_as_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uczen/index"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("uczen/index").await.unwrap_err();
    assert!(matches!(err, SynergiaError::Transport(_)));
}

#[tokio::test]
async fn invalid_selectors_fail_before_touching_the_network() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let err = client
        .map_list(MappingSpec::get("uczen/index", "td:nth-child("), row_text)
        .await
        .unwrap_err();
    assert!(matches!(err, SynergiaError::Selector { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn authorization_walks_the_three_steps_and_returns_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/OAuth/Authorization"))
        .and(query_param("client_id", "46"))
        .and(query_param("response_type", "code"))
        .and(query_param("scope", "mydata"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "oauth_entry=1; Path=/")
                .set_body_string("<html>formularz logowania</html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/OAuth/Authorization"))
        .and(query_param("client_id", "46"))
        .and(body_string_contains("action=login"))
        .and(body_string_contains("login=jan.kowalski"))
        .and(body_string_contains("pass=haslo123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "DZIENNIKSID=s3cr3t; Path=/")
                .set_body_string("<html>przekierowanie</html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/OAuth/Authorization/2FA"))
        .and(query_param("client_id", "46"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cookies = client.authorize("jan.kowalski", "haslo123").await.unwrap();

    assert!(cookies
        .iter()
        .any(|c| c.key == "DZIENNIKSID" && c.value == "s3cr3t"));
    assert!(cookies.iter().any(|c| c.key == "oauth_entry"));
    assert!(cookies.iter().any(|c| c.key == "TestCookie"));
}

#[tokio::test]
async fn a_failing_authorization_step_is_reported_not_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/OAuth/Authorization"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.authorize("jan", "haslo").await.unwrap_err();
    match err {
        SynergiaError::Auth { step, .. } => assert_eq!(step, "entry"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn absolute_targets_skip_the_portal_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zewnetrzny/zasob"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .endpoints(Endpoints {
            // Deliberately bogus portal base; the absolute target must win.
            portal_base_url: "http://127.0.0.1:1".to_string(),
            ..test_endpoints(&server)
        })
        .build()
        .unwrap();

    let url = format!("{}/zewnetrzny/zasob", server.uri());
    client.get(&url).await.unwrap();
}
