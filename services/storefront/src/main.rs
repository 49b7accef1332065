use anyhow::{Context, Result, bail};
use auth::{
    AuthConfig, HelixClient, IdentityManager, IdentityState, ImplicitFlowClient, LoginStart,
    SessionStore,
};
use common::format::{accrued_points, clamp_integer};
use common::{FileStorage, MemoryStorage};
use storefront::{
    BalanceGateway, CATALOG, HttpLedger, HttpRelay, OrderStage, OrderWorkflow, RelayGateway,
    StorefrontConfig, catalog,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

type Identity = IdentityManager<HelixClient>;
type Workflow = OrderWorkflow<HttpLedger, HttpRelay>;

const USAGE: &str = "usage: storefront <catalog | calc <clips> | login | callback <url> | balance | order <item> <option> [comment] | remember <on|off> | logout>";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = StorefrontConfig::from_env()?;
    let auth_config = AuthConfig::from_env()?;
    info!("Starting storefront");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("catalog");

    match command {
        "catalog" => print_catalog(),
        "calc" => {
            let raw = args.get(1).map(String::as_str).unwrap_or("");
            let clips = clamp_integer(raw, 0, 9999).max(1) as u32;
            println!("{clips} clips → {} 🪙", accrued_points(clips));
        }
        "login" => {
            let mut identity = identity(&auth_config, &config)?;
            let mut page = page_url(&config)?;
            identity.initialize(&mut page).await;

            match identity.begin_login(&page, &config.user_agent)? {
                LoginStart::Redirect(request) => {
                    println!("Open this address to sign in:\n{}", request.url);
                    if let Some(intent) = request.intent_url {
                        println!("Android external browser:\n{intent}");
                    }
                }
                LoginStart::InAppWarning { page_url } => {
                    println!("This in-app browser breaks the sign-in redirect.");
                    println!("Open the page in a regular browser instead: {page_url}");
                }
            }
        }
        "callback" => {
            let raw = args.get(1).context(USAGE)?;
            let mut location: Url = raw.parse().context("callback is not a valid url")?;
            let mut identity = identity(&auth_config, &config)?;

            match identity.initialize(&mut location).await {
                IdentityState::Authenticated(session) => {
                    println!("Signed in as {}", session.label());
                }
                IdentityState::ExchangeFailed(reason) => bail!("Sign-in failed: {reason}"),
                _ => bail!("No access token in {raw}"),
            }
            // Session-scoped storage does not outlive the process
            identity.set_remember(true)?;
        }
        "balance" => {
            let mut identity = identity(&auth_config, &config)?;
            let workflow = workflow(&config);
            identity.initialize(&mut page_url(&config)?).await;

            let session = identity.session().cloned();
            let (_, view) = tokio::join!(
                identity.refresh_display_name(),
                workflow.refresh_balance(session.as_ref())
            );
            println!("{}\n{}", view.text(), view.hint());
        }
        "order" => {
            let item = parse_index(args.get(1))?;
            let option = parse_index(args.get(2))?;
            let selection = catalog::select(item, option).context("no such catalog option")?;

            let mut identity = identity(&auth_config, &config)?;
            let mut workflow = workflow(&config);
            identity.initialize(&mut page_url(&config)?).await;

            workflow.select(selection);
            workflow.set_comment(args.get(3..).map(|rest| rest.join(" ")).unwrap_or_default());

            let session = identity.session().cloned();
            match workflow.place_order(session.as_ref()).await {
                OrderStage::Success => {
                    println!("Order sent ✅");
                    println!("{}", workflow.balance().text());
                }
                OrderStage::Error { title, text } => bail!("{title}: {text}"),
                _ => match workflow.notice() {
                    Some(notice) => println!("{}\n{}", notice.title, notice.text),
                    None => println!("Order was not placed"),
                },
            }
        }
        "remember" => {
            let remember = match args.get(1).map(String::as_str) {
                Some("on") => true,
                Some("off") => false,
                _ => bail!(USAGE),
            };
            let mut identity = identity(&auth_config, &config)?;
            identity.initialize(&mut page_url(&config)?).await;
            identity.set_remember(remember)?;
            println!("Remember me: {}", if remember { "on" } else { "off" });
        }
        "logout" => {
            let mut identity = identity(&auth_config, &config)?;
            identity.logout();
            println!("Signed out");
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn identity(auth_config: &AuthConfig, config: &StorefrontConfig) -> Result<Identity> {
    let durable = FileStorage::open(&config.state_dir)?;
    let store = SessionStore::new(
        &auth_config.auth_storage_key,
        Box::new(durable),
        Box::new(MemoryStorage::new()),
    );
    let oauth = ImplicitFlowClient::new(auth_config)?;
    let provider = HelixClient::new(auth_config)?;
    Ok(IdentityManager::new(provider, store, oauth))
}

fn workflow(config: &StorefrontConfig) -> Workflow {
    let ledger = BalanceGateway::new(HttpLedger::new(&config.balance_api_url), &config.spend_token);
    let relay = RelayGateway::new(HttpRelay::new(&config.relay_api_url));
    OrderWorkflow::new(ledger, relay, config)
}

fn page_url(config: &StorefrontConfig) -> Result<Url> {
    config.page_url.parse().context("STOREFRONT_PAGE_URL is not a valid url")
}

fn parse_index(arg: Option<&String>) -> Result<usize> {
    arg.context(USAGE)?
        .parse()
        .with_context(|| format!("not a catalog index: {arg:?}"))
}

fn print_catalog() {
    for (i, item) in CATALOG.iter().enumerate() {
        match item.badge {
            Some(badge) => println!("[{i}] {} ({badge})", item.title),
            None => println!("[{i}] {}", item.title),
        }
        for (j, option) in item.options.iter().enumerate() {
            let price = option
                .price
                .map_or_else(|| "negotiated".to_string(), |p| format!("{p} 🪙"));
            println!("    [{j}] {} — {price}", option.label);
        }
        if let Some(note) = item.note {
            println!("    {note}");
        }
    }
}
