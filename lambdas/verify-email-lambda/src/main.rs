use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{run, service_fn, tracing, Error, Request};
use medicos_shared::config::{load_sdk_config, Config};
use medicos_shared::documents::{DocumentStore, DynamoDocumentStore};
use medicos_shared::identity::CognitoIdentityProvider;
use medicos_shared::AppState;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;

    // Initialize AWS clients once at startup
    let sdk_config = load_sdk_config(&config).await;

    let identity = Arc::new(CognitoIdentityProvider::new(
        CognitoClient::new(&sdk_config),
        config.user_pool_id.clone(),
    ));

    let documents = config.mirror_table.as_ref().map(|table| {
        tracing::info!("Mirroring verifications to DynamoDB table {}", table);
        Arc::new(DynamoDocumentStore::new(DynamoClient::new(&sdk_config), table.clone()))
            as Arc<dyn DocumentStore>
    });

    let state = AppState::new(config, identity, documents);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
