use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::amount;
use crate::card::{Card, Movement};
use crate::error::{Error, Result};
use crate::markup::{self, Element, Path};
use crate::portal;
use crate::settings::Settings;
use crate::transport::{HttpTransport, Reply, Transport};

/// Merchant category prefix in movement descriptions ("Restauração: ...").
static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*: ").unwrap());

/// Number of label/value rows on the account summary.
const SUMMARY_FIELDS: usize = 5;

struct Paths {
    form_inputs: Path,
    summary_rows: Path,
    summary_label: Path,
    summary_value: Path,
    movement_rows: Path,
    date: Path,
    id: Path,
    kind: Path,
    description: Path,
    credit: Path,
    debit: Path,
    balance: Path,
}

impl Paths {
    fn compile() -> Result<Self> {
        Ok(Paths {
            form_inputs: portal::FORM_INPUTS.parse()?,
            summary_rows: portal::SUMMARY_ROWS.parse()?,
            summary_label: portal::SUMMARY_LABEL.parse()?,
            summary_value: portal::SUMMARY_VALUE.parse()?,
            movement_rows: portal::MOVEMENT_ROWS.parse()?,
            date: portal::MOVEMENT_DATE.parse()?,
            id: portal::MOVEMENT_ID.parse()?,
            kind: portal::MOVEMENT_TYPE.parse()?,
            description: portal::MOVEMENT_DESCRIPTION.parse()?,
            credit: portal::MOVEMENT_CREDIT.parse()?,
            debit: portal::MOVEMENT_DEBIT.parse()?,
            balance: portal::MOVEMENT_BALANCE.parse()?,
        })
    }
}

/// A session with the portal: login, scrape, logout.
///
/// The instance owns the cookie session, so `fetch` takes `&mut self`; do not
/// share one instance between concurrent callers.
pub struct Alacard<T: Transport> {
    transport: T,
    settings: Settings,
    paths: Paths,
}

impl Alacard<HttpTransport> {
    pub fn connect(settings: Settings) -> Result<Self> {
        let transport = HttpTransport::new(&settings)?;
        Self::with_transport(settings, transport)
    }
}

impl<T: Transport> Alacard<T> {
    pub fn with_transport(settings: Settings, transport: T) -> Result<Self> {
        Ok(Alacard {
            transport,
            settings,
            paths: Paths::compile()?,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in and read the card summary, plus its movements when
    /// `include_history` is set. The password lives only for this call.
    ///
    /// A 2xx login response without the summary rows is reported as
    /// `Error::Authentication`. The portal has no distinct rejection signal, so
    /// a layout change on its side shows up the same way.
    pub fn fetch(&mut self, username: &str, password: &str, include_history: bool) -> Result<Card> {
        let main_url = self.settings.url(portal::MAIN_PAGE);
        info!(url = %main_url, "loading login page");
        let reply = self.transport.get(&main_url)?;
        let login_page = page(&main_url, reply)?;

        let mut form = self.login_form(&login_page);
        set_field(&mut form, portal::USERNAME_FIELD, username);
        set_field(&mut form, portal::PASSWORD_FIELD, password);
        debug!(
            fields = ?form.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            "login form"
        );

        let login_url = self.settings.url(portal::LOGIN_ENDPOINT);
        info!(url = %login_url, "submitting credentials");
        let reply = self.transport.post_form(&login_url, &form);
        drop(form);
        let account_page = page(&login_url, reply?)?;

        let card = self.summary(&account_page)?;

        let movements = if include_history {
            let history_url = self.settings.url(portal::HISTORY_PAGE);
            info!(url = %history_url, "loading movements");
            let reply = self.transport.get(&history_url)?;
            let history_page = page(&history_url, reply)?;
            self.movements(&history_page)?
        } else {
            Vec::new()
        };
        info!(movements = movements.len(), "card read");

        self.logout();
        Ok(Card { movements, ..card })
    }

    /// Named inputs of the login form with their default values. Hidden
    /// inputs carry the session token and must be echoed back as found.
    fn login_form(&self, page: &Element) -> Vec<(String, String)> {
        let form: Vec<(String, String)> = page
            .select(&self.paths.form_inputs)
            .into_iter()
            .filter_map(|input| {
                let name = input.attr("name")?;
                Some((name.to_string(), input.attr("value").unwrap_or_default().to_string()))
            })
            .collect();
        if form.is_empty() {
            warn!("login page has no form inputs");
        }
        form
    }

    fn summary(&self, page: &Element) -> Result<Card> {
        let mut values = Vec::new();
        let mut unpaired = Vec::new();
        for row in page.select(&self.paths.summary_rows) {
            let Some(label) = row.first(&self.paths.summary_label) else {
                continue;
            };
            match row.first(&self.paths.summary_value) {
                Some(value) => values.push(value.text()),
                None => unpaired.push(label.text()),
            }
        }

        // Values are positional; a gap would shift every later field.
        if !values.is_empty() && !unpaired.is_empty() {
            warn!(labels = ?unpaired, "card summary rows without a value");
            return Err(Error::Authentication);
        }

        let [outstanding, current, holder, number, expiration] = match values[..] {
            [a, b, c, d, e, ..] => [a, b, c, d, e],
            _ => {
                warn!(
                    found = values.len(),
                    expected = SUMMARY_FIELDS,
                    "card summary missing after login"
                );
                return Err(Error::Authentication);
            }
        };

        Ok(Card {
            holder_name: holder.to_string(),
            number: number.to_string(),
            expiration_date: expiration.to_string(),
            outstanding_balance: amount::normalize(outstanding)?,
            current_balance: amount::normalize(current)?,
            movements: Vec::new(),
        })
    }

    fn movements(&self, page: &Element) -> Result<Vec<Movement>> {
        page.select(&self.paths.movement_rows)
            .into_iter()
            .filter(|row| {
                row.attr("class")
                    .is_some_and(|class| portal::MOVEMENT_ROW_CLASSES.contains(&class))
            })
            .map(|row| self.movement(row))
            .collect()
    }

    fn movement(&self, row: &Element) -> Result<Movement> {
        let cell = |path: &Path| {
            row.require_text(path)
                .map_err(|e| Error::Parse(format!("movement row: {}", e)))
        };
        Ok(Movement {
            id: cell(&self.paths.id)?.to_string(),
            date: cell(&self.paths.date)?.to_string(),
            kind: cell(&self.paths.kind)?.to_string(),
            description: CATEGORY_RE
                .replace_all(cell(&self.paths.description)?, "")
                .into_owned(),
            debit: amount::normalize(cell(&self.paths.debit)?)?,
            credit: amount::normalize(cell(&self.paths.credit)?)?,
            balance: amount::normalize(cell(&self.paths.balance)?)?,
        })
    }

    // Best effort: the card is already read.
    fn logout(&mut self) {
        let url = self.settings.url(portal::LOGOUT_PAGE);
        match self.transport.get(&url) {
            Ok(reply) if reply.is_success() => debug!("logged out"),
            Ok(reply) => warn!(status = reply.status, "logout refused"),
            Err(e) => warn!(error = %e, "logout failed"),
        }
    }
}

fn page(url: &str, reply: Reply) -> Result<Element> {
    if !reply.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: reply.status,
        });
    }
    markup::parse(&reply.body)
}

fn set_field(form: &mut Vec<(String, String)>, name: &str, value: &str) {
    match form.iter_mut().find(|(field, _)| field == name) {
        Some((_, slot)) => *slot = value.to_string(),
        None => form.push((name.to_string(), value.to_string())),
    }
}
