use contract_deployer::imports::{ImportError, ImportResolver};
use pretty_assertions::assert_eq;
use std::path::Path;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn resolver(cdn: &MockServer) -> ImportResolver {
    ImportResolver::new(
        reqwest::Client::new(),
        Url::parse(&format!("{}/", cdn.uri())).unwrap(),
    )
}

const ERC20_PATH: &str = "/@openzeppelin/contracts/token/ERC20/ERC20.sol";
const IERC20_PATH: &str = "/@openzeppelin/contracts/token/ERC20/IERC20.sol";

#[tokio::test]
async fn flattens_registry_imports_recursively() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ERC20_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("import \"./IERC20.sol\";\ncontract ERC20 is IERC20 {}"),
        )
        .expect(1)
        .mount(&cdn)
        .await;
    Mock::given(method("GET"))
        .and(path(IERC20_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("interface IERC20 {}"))
        .expect(1)
        .mount(&cdn)
        .await;

    let source = "import \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";\ncontract Token is ERC20 {}";
    let resolved = resolver(&cdn)
        .resolve("Token.sol", source, None)
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved.len(), 3);
    let root = resolved.get(Path::new("Token.sol")).unwrap();
    assert!(root.content.as_str().contains("import \"./ERC20.sol\";"));
    let erc20 = resolved.get(Path::new("ERC20.sol")).unwrap();
    assert!(erc20.content.as_str().contains("import \"./IERC20.sol\";"));
    assert!(resolved.contains_key(Path::new("IERC20.sol")));
}

#[tokio::test]
async fn shared_import_is_fetched_once() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ERC20_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("import \"./IERC20.sol\";\ncontract ERC20 is IERC20 {}"),
        )
        .mount(&cdn)
        .await;
    Mock::given(method("GET"))
        .and(path(IERC20_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("interface IERC20 {}"))
        .expect(1)
        .mount(&cdn)
        .await;

    // the root and ERC20.sol both pull IERC20.sol
    let source = "import \"@openzeppelin/contracts/token/ERC20/IERC20.sol\";\n\
                  import \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";\n\
                  contract Token is ERC20 {}";
    let resolved = resolver(&cdn)
        .resolve("Token.sol", source, None)
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved.len(), 3);
}

#[tokio::test]
async fn missing_import_fails_the_whole_resolution() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&cdn)
        .await;

    let source = "import \"@openzeppelin/contracts/missing/Gone.sol\";\ncontract Token {}";
    let err = resolver(&cdn)
        .resolve("Token.sol", source, None)
        .await
        .expect_err("no partial success");

    match err {
        ImportError::Http { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sources_without_unresolved_imports_are_untouched() {
    // no mock server: any fetch attempt would error out
    let resolver = ImportResolver::new(
        reqwest::Client::new(),
        Url::parse("https://unpkg.com/").unwrap(),
    );
    let mut local = ethers_solc::artifacts::Sources::new();
    local.insert(
        "IERC20.sol".into(),
        ethers_solc::artifacts::Source::new("interface IERC20 {}"),
    );
    let source = "import \"./IERC20.sol\";\ncontract Token is IERC20 {}";

    let first = resolver
        .resolve("Token.sol", source, Some(&local))
        .await
        .expect("fetch-free resolution");
    let second = resolver
        .resolve("Token.sol", source, Some(&first))
        .await
        .expect("fetch-free resolution");

    assert_eq!(first.len(), second.len());
    for (name, entry) in &first {
        assert_eq!(
            second.get(name).unwrap().content.as_str(),
            entry.content.as_str(),
            "{name:?} changed across resolutions"
        );
    }
}
