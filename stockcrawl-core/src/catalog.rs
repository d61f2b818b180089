//! Source catalog: one static [`SourceSpec`] per upstream feed family.
//!
//! A spec carries everything the walker and the normalizer need: the URL
//! template, how pages end, how the payload is laid out, and the typed
//! mapping from canonical output fields to upstream column names. The
//! catalog is validated when it is built, so a typo in a mapping is a load
//! error rather than a silently wrong column at run time.

use crate::fetch::RenderMode;
use crate::normalize::Fixup;
use crate::params::{placeholders, TemplateError};
use crate::parse::{directory, PayloadFormat, TableGroup, TableLayout, TransposedTable};
use crate::walk::{Pagination, StopPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Ticker,
    Tdate,
    Open,
    High,
    Low,
    Close,
    Volume,
    ItemName,
    MarketSum,
    CompanyName,
    Industry,
    Revenue,
    Opm,
    Earning,
    Roe,
    Bps,
    Dps,
    Type,
    IsForecast,
    Assets,
    Liabilities,
    Capital,
    Cashflow,
    Source,
    CtPrice,
    LtPrice,
    ChangeRatio,
    Opinion,
    LOpinion,
    CumInvest,
    EvalTotal,
    Sdate,
    Name,
    NMonths,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Ticker => "ticker",
            Field::Tdate => "tdate",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::ItemName => "itemname",
            Field::MarketSum => "market_sum",
            Field::CompanyName => "company_name",
            Field::Industry => "industry",
            Field::Revenue => "revenue",
            Field::Opm => "opm",
            Field::Earning => "earning",
            Field::Roe => "roe",
            Field::Bps => "bps",
            Field::Dps => "dps",
            Field::Type => "type",
            Field::IsForecast => "is_forecast",
            Field::Assets => "assets",
            Field::Liabilities => "liabilities",
            Field::Capital => "capital",
            Field::Cashflow => "cashflow",
            Field::Source => "source",
            Field::CtPrice => "ct_price",
            Field::LtPrice => "lt_price",
            Field::ChangeRatio => "change_ratio",
            Field::Opinion => "opinion",
            Field::LOpinion => "l_opinion",
            Field::CumInvest => "cum_invest",
            Field::EvalTotal => "eval_total",
            Field::Sdate => "sdate",
            Field::Name => "name",
            Field::NMonths => "n_months",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a canonical field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceField {
    /// A named column of the parsed payload.
    Column(&'static str),
    /// The payload's `ticker` column if it has one, else the call's ticker.
    Ticker,
    /// Filled by a fixup.
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceId {
    DomesticIndex,
    StockPrice,
    GlobalIndex,
    EtfList,
    ExchangeList,
    FundPrice,
    FundDiscovery,
    FundamentalSnapshot,
    FundamentalStatement,
    Consensus,
}

impl SourceId {
    pub const ALL: [SourceId; 10] = [
        SourceId::DomesticIndex,
        SourceId::StockPrice,
        SourceId::GlobalIndex,
        SourceId::EtfList,
        SourceId::ExchangeList,
        SourceId::FundPrice,
        SourceId::FundDiscovery,
        SourceId::FundamentalSnapshot,
        SourceId::FundamentalStatement,
        SourceId::Consensus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::DomesticIndex => "domestic-index",
            SourceId::StockPrice => "stock-price",
            SourceId::GlobalIndex => "global-index",
            SourceId::EtfList => "etf-list",
            SourceId::ExchangeList => "exchange-list",
            SourceId::FundPrice => "fund-price",
            SourceId::FundDiscovery => "fund-discovery",
            SourceId::FundamentalSnapshot => "fundamental-snapshot",
            SourceId::FundamentalStatement => "fundamental-statement",
            SourceId::Consensus => "consensus",
        }
    }

    /// Output columns, in order, for this source.
    pub fn schema(self) -> &'static [Field] {
        use Field::*;
        match self {
            SourceId::DomesticIndex | SourceId::StockPrice | SourceId::GlobalIndex => {
                &[Ticker, Tdate, Open, High, Low, Close, Volume]
            }
            SourceId::EtfList => &[Ticker, ItemName, MarketSum],
            SourceId::ExchangeList => &[CompanyName, Ticker, Industry],
            SourceId::FundamentalSnapshot => &[
                Ticker, Tdate, Revenue, Opm, Earning, Roe, Bps, Dps, Type, IsForecast,
            ],
            SourceId::FundamentalStatement => &[
                Ticker, Tdate, Revenue, Opm, Earning, Assets, Liabilities, Capital, Cashflow, Type,
            ],
            SourceId::Consensus => &[
                Ticker, Source, Tdate, CtPrice, LtPrice, ChangeRatio, Opinion, LOpinion,
            ],
            SourceId::FundPrice => &[Ticker, Tdate, Close, CumInvest, EvalTotal],
            SourceId::FundDiscovery => &[Sdate, Ticker, Name, NMonths],
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownSource(s.to_string()))
    }
}

/// Immutable configuration for one upstream source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub id: SourceId,
    /// URL with `{placeholder}`s; paged sources carry `{page}`.
    pub url_template: &'static str,
    pub render: RenderMode,
    pub pagination: Pagination,
    /// Hard bound on pages fetched by any paged policy.
    pub max_pages: Option<u32>,
    pub format: PayloadFormat,
    /// Canonical field → upstream source, in output order.
    pub columns: &'static [(Field, SourceField)],
    /// Rows missing any of these after fixups are dropped.
    pub required: &'static [Field],
    /// Applied in order to every selected row.
    pub fixups: &'static [Fixup],
    /// Drop exact-duplicate rows after concatenating pages.
    pub dedup: bool,
}

impl SourceSpec {
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.columns.iter().map(|(f, _)| *f)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields().map(|f| f.as_str().to_string()).collect()
    }

    pub fn is_paged(&self) -> bool {
        matches!(self.pagination, Pagination::Paged(_))
    }

    /// Check the spec against its own declarations and the canonical schema.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let id = self.id;

        let mut seen: Vec<Field> = Vec::with_capacity(self.columns.len());
        for field in self.fields() {
            if seen.contains(&field) {
                return Err(CatalogError::DuplicateField { id, field });
            }
            seen.push(field);
        }

        if seen.as_slice() != id.schema() {
            return Err(CatalogError::SchemaMismatch {
                id,
                expected: id.schema().iter().map(|f| f.as_str()).collect(),
                found: seen.iter().map(|f| f.as_str()).collect(),
            });
        }

        if let Some(field) = self.required.iter().find(|f| !seen.contains(f)) {
            return Err(CatalogError::UndeclaredField {
                id,
                field: *field,
                role: "required",
            });
        }

        for fixup in self.fixups {
            if let Some(field) = fixup.fields().into_iter().find(|f| !seen.contains(f)) {
                return Err(CatalogError::UndeclaredField {
                    id,
                    field,
                    role: "fixup",
                });
            }
        }

        let names = placeholders(self.url_template)
            .map_err(|error| CatalogError::Template { id, error })?;
        let has_page = names.contains(&"page");
        if has_page != self.is_paged() {
            return Err(CatalogError::PagePlaceholder {
                id,
                paged: self.is_paged(),
            });
        }

        if let PayloadFormat::JsonArray { pointer } = self.format {
            let names =
                placeholders(pointer).map_err(|error| CatalogError::Template { id, error })?;
            if names.contains(&"page") {
                return Err(CatalogError::Template {
                    id,
                    error: TemplateError::Unknown("page".into()),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("{id}: source registered twice")]
    DuplicateSource { id: SourceId },

    #[error("{id}: field {field} mapped twice")]
    DuplicateField { id: SourceId, field: Field },

    #[error("{id}: columns {found:?} do not match schema {expected:?}")]
    SchemaMismatch {
        id: SourceId,
        expected: Vec<&'static str>,
        found: Vec<&'static str>,
    },

    #[error("{id}: {role} field {field} is not a declared column")]
    UndeclaredField {
        id: SourceId,
        field: Field,
        role: &'static str,
    },

    #[error("{id}: bad URL template: {error}")]
    Template {
        id: SourceId,
        error: TemplateError,
    },

    #[error("{id}: paged={paged} but {{page}} placeholder presence disagrees")]
    PagePlaceholder { id: SourceId, paged: bool },
}

/// Validated registry of source specs.
#[derive(Debug, Clone)]
pub struct Catalog {
    specs: Vec<SourceSpec>,
}

impl Catalog {
    /// Build a catalog from arbitrary specs, validating each.
    pub fn new(specs: Vec<SourceSpec>) -> Result<Self, CatalogError> {
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.id == spec.id) {
                return Err(CatalogError::DuplicateSource { id: spec.id });
            }
            spec.validate()?;
        }
        Ok(Self { specs })
    }

    /// The built-in sources.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(BUILTIN.to_vec())
    }

    pub fn get(&self, id: SourceId) -> Result<&SourceSpec, CatalogError> {
        self.specs
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CatalogError::UnknownSource(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.specs.iter().map(|s| s.id)
    }
}

// ── tickers ──────────────────────────────────────────────────────────

/// Domestic market indexes served by the chart feed.
pub const DOMESTIC_INDEXES: &[&str] = &["KOSPI", "KOSDAQ"];

/// Bars requested per domestic index.
pub const INDEX_BAR_COUNT: u32 = 10_000;

/// Global indexes: (symbol, display name).
pub const GLOBAL_INDEXES: &[(&str, &str)] = &[
    ("SPI@SPX", "S&P500"),
    ("NII@NI225", "Nikkei"),
    ("STX@SX5E", "Eurostoxx"),
    ("SHS@000001", "Shanghai"),
];

/// Exchange-traded product kinds listed by the ETF/ETN feed.
pub const EXCHANGE_TRADED_KINDS: &[&str] = &["etf", "etn"];

// ── layouts ──────────────────────────────────────────────────────────

const CHART_COLUMNS: &[&str] = &["tdate", "open", "high", "low", "close", "volume"];

/// Position of the listing table in the exchange download.
pub const EXCHANGE_LIST_TABLE: usize = 0;

/// Position of the daily quote table on a fund price page.
pub const FUND_PRICE_TABLE: usize = 0;

/// Position of the broker estimate table on the rendered consensus page.
pub const CONSENSUS_TABLE: usize = 7;

/// Financial highlight tables on the company snapshot page.
pub const SNAPSHOT_ANNUAL_TABLE: usize = 11;
pub const SNAPSHOT_QUARTER_TABLE: usize = 12;

/// Statement page tables: income, balance sheet, cash flow.
pub const STATEMENT_ANNUAL_TABLES: [usize; 3] = [0, 2, 4];
pub const STATEMENT_QUARTER_TABLES: [usize; 3] = [1, 3, 5];

/// `type` tags for annual and quarterly periods.
pub const ANNUAL: &str = "Y";
pub const QUARTER: &str = "Q";

const SNAPSHOT_LABELS: &[&str] = &["매출액", "영업이익", "당기순이익", "ROE", "BPS(원)", "DPS(원)"];
const INCOME_LABELS: &[&str] = &["매출액", "영업이익", "당기순이익"];
const BALANCE_LABELS: &[&str] = &["자산", "부채", "자본"];
const CASHFLOW_LABELS: &[&str] = &["영업활동으로인한현금흐름"];

const SNAPSHOT_GROUPS: &[TableGroup] = &[
    TableGroup {
        tag: ANNUAL,
        tables: &[TransposedTable {
            index: SNAPSHOT_ANNUAL_TABLE,
            labels: SNAPSHOT_LABELS,
        }],
    },
    TableGroup {
        tag: QUARTER,
        tables: &[TransposedTable {
            index: SNAPSHOT_QUARTER_TABLE,
            labels: SNAPSHOT_LABELS,
        }],
    },
];

const STATEMENT_GROUPS: &[TableGroup] = &[
    TableGroup {
        tag: ANNUAL,
        tables: &[
            TransposedTable {
                index: STATEMENT_ANNUAL_TABLES[0],
                labels: INCOME_LABELS,
            },
            TransposedTable {
                index: STATEMENT_ANNUAL_TABLES[1],
                labels: BALANCE_LABELS,
            },
            TransposedTable {
                index: STATEMENT_ANNUAL_TABLES[2],
                labels: CASHFLOW_LABELS,
            },
        ],
    },
    TableGroup {
        tag: QUARTER,
        tables: &[
            TransposedTable {
                index: STATEMENT_QUARTER_TABLES[0],
                labels: INCOME_LABELS,
            },
            TransposedTable {
                index: STATEMENT_QUARTER_TABLES[1],
                labels: BALANCE_LABELS,
            },
            TransposedTable {
                index: STATEMENT_QUARTER_TABLES[2],
                labels: CASHFLOW_LABELS,
            },
        ],
    },
];

// ── specs ────────────────────────────────────────────────────────────

const PRICE_COLUMNS: &[(Field, SourceField)] = &[
    (Field::Ticker, SourceField::Ticker),
    (Field::Tdate, SourceField::Column("tdate")),
    (Field::Open, SourceField::Column("open")),
    (Field::High, SourceField::Column("high")),
    (Field::Low, SourceField::Column("low")),
    (Field::Close, SourceField::Column("close")),
    (Field::Volume, SourceField::Column("volume")),
];

const PRICE_FIXUPS: &[Fixup] = &[
    Fixup::Date(Field::Tdate),
    Fixup::Numeric(Field::Open),
    Fixup::Numeric(Field::High),
    Fixup::Numeric(Field::Low),
    Fixup::Numeric(Field::Close),
    Fixup::Numeric(Field::Volume),
];

const CHART_URL: &str = "https://fchart.stock.naver.com/sise.nhn?symbol={ticker}&timeframe={timeframe}&count={count}&requestType=0";

pub const BUILTIN: [SourceSpec; 10] = [
    SourceSpec {
        id: SourceId::DomesticIndex,
        url_template: CHART_URL,
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::ChartItems {
            columns: CHART_COLUMNS,
        },
        columns: PRICE_COLUMNS,
        required: &[Field::Ticker, Field::Tdate],
        fixups: PRICE_FIXUPS,
        dedup: false,
    },
    SourceSpec {
        id: SourceId::StockPrice,
        url_template: CHART_URL,
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::ChartItems {
            columns: CHART_COLUMNS,
        },
        columns: PRICE_COLUMNS,
        required: &[Field::Ticker, Field::Tdate],
        fixups: PRICE_FIXUPS,
        dedup: false,
    },
    SourceSpec {
        id: SourceId::GlobalIndex,
        url_template:
            "https://finance.naver.com/world/worldDayListJson.nhn?symbol={ticker}&fdtc=0&page={page}",
        render: RenderMode::Plain,
        pagination: Pagination::Paged(StopPolicy::ShortPage),
        max_pages: Some(10_000),
        format: PayloadFormat::JsonArray { pointer: "" },
        columns: &[
            (Field::Ticker, SourceField::Column("symb")),
            (Field::Tdate, SourceField::Column("xymd")),
            (Field::Open, SourceField::Column("open")),
            (Field::High, SourceField::Column("high")),
            (Field::Low, SourceField::Column("low")),
            (Field::Close, SourceField::Column("clos")),
            (Field::Volume, SourceField::Column("gvol")),
        ],
        required: &[Field::Ticker, Field::Tdate],
        fixups: PRICE_FIXUPS,
        dedup: false,
    },
    SourceSpec {
        id: SourceId::EtfList,
        url_template: "https://finance.naver.com/api/sise/{kind}ItemList.nhn",
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::JsonArray {
            pointer: "/result/{kind}ItemList",
        },
        columns: &[
            (Field::Ticker, SourceField::Column("itemcode")),
            (Field::ItemName, SourceField::Column("itemname")),
            (Field::MarketSum, SourceField::Column("marketSum")),
        ],
        required: &[Field::Ticker],
        fixups: &[Fixup::Numeric(Field::MarketSum)],
        dedup: false,
    },
    SourceSpec {
        id: SourceId::ExchangeList,
        url_template:
            "https://kind.krx.co.kr/corpgeneral/corpList.do?method=download&searchType=13",
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::HtmlTable(TableLayout {
            index: EXCHANGE_LIST_TABLE,
            guard: &["회사명", "종목코드", "업종"],
            columns: None,
        }),
        columns: &[
            (Field::CompanyName, SourceField::Column("회사명")),
            (Field::Ticker, SourceField::Column("종목코드")),
            (Field::Industry, SourceField::Column("업종")),
        ],
        required: &[Field::Ticker],
        fixups: &[Fixup::ZeroPad {
            field: Field::Ticker,
            width: 6,
        }],
        dedup: false,
    },
    SourceSpec {
        id: SourceId::FundPrice,
        url_template:
            "https://finance.naver.com/fund/fundDailyQuoteList.nhn?fundCd={ticker}&page={page}",
        render: RenderMode::Plain,
        pagination: Pagination::Paged(StopPolicy::FixedCeiling),
        max_pages: None,
        format: PayloadFormat::HtmlTable(TableLayout {
            index: FUND_PRICE_TABLE,
            guard: &["날짜", "기준가", "설정원본", "순자산총액"],
            columns: None,
        }),
        columns: &[
            (Field::Ticker, SourceField::Ticker),
            (Field::Tdate, SourceField::Column("날짜")),
            (Field::Close, SourceField::Column("기준가")),
            (Field::CumInvest, SourceField::Column("설정원본")),
            (Field::EvalTotal, SourceField::Column("순자산총액")),
        ],
        required: &[Field::Ticker, Field::Tdate],
        fixups: &[
            Fixup::Date(Field::Tdate),
            Fixup::Numeric(Field::Close),
            Fixup::Numeric(Field::CumInvest),
            Fixup::Numeric(Field::EvalTotal),
        ],
        dedup: true,
    },
    SourceSpec {
        id: SourceId::FundDiscovery,
        url_template: "https://finance.naver.com/fund/fundFinderList.nhn?page={page}",
        render: RenderMode::Plain,
        pagination: Pagination::Paged(StopPolicy::ContentAbsence),
        max_pages: Some(1_000),
        format: PayloadFormat::Custom(directory::parse_fund_list),
        columns: &[
            (Field::Sdate, SourceField::Column("sdate")),
            (Field::Ticker, SourceField::Column("ticker")),
            (Field::Name, SourceField::Column("name")),
            (Field::NMonths, SourceField::Derived),
        ],
        required: &[Field::Ticker, Field::Sdate],
        fixups: &[
            Fixup::Date(Field::Sdate),
            Fixup::MonthsSince {
                from: Field::Sdate,
                into: Field::NMonths,
            },
        ],
        dedup: true,
    },
    SourceSpec {
        id: SourceId::FundamentalSnapshot,
        url_template: "https://comp.fnguide.com/SVO2/ASP/SVD_Main.asp?pGB=1&gicode=A{ticker}",
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::Transposed(SNAPSHOT_GROUPS),
        columns: &[
            (Field::Ticker, SourceField::Ticker),
            (Field::Tdate, SourceField::Column("tdate")),
            (Field::Revenue, SourceField::Column("매출액")),
            (Field::Opm, SourceField::Column("영업이익")),
            (Field::Earning, SourceField::Column("당기순이익")),
            (Field::Roe, SourceField::Column("ROE")),
            (Field::Bps, SourceField::Column("BPS(원)")),
            (Field::Dps, SourceField::Column("DPS(원)")),
            (Field::Type, SourceField::Column("type")),
            (Field::IsForecast, SourceField::Derived),
        ],
        required: &[Field::Ticker, Field::Tdate],
        fixups: &[
            Fixup::ForecastFlag {
                from: Field::Tdate,
                into: Field::IsForecast,
            },
            Fixup::MonthEnd(Field::Tdate),
            Fixup::Numeric(Field::Revenue),
            Fixup::Numeric(Field::Opm),
            Fixup::Numeric(Field::Earning),
            Fixup::Numeric(Field::Roe),
            Fixup::Numeric(Field::Bps),
            Fixup::Numeric(Field::Dps),
        ],
        dedup: false,
    },
    SourceSpec {
        id: SourceId::FundamentalStatement,
        url_template:
            "https://comp.fnguide.com/SVO2/ASP/SVD_Finance.asp?pGB=1&gicode=A{ticker}&ReportGB=D",
        render: RenderMode::Plain,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::Transposed(STATEMENT_GROUPS),
        columns: &[
            (Field::Ticker, SourceField::Ticker),
            (Field::Tdate, SourceField::Column("tdate")),
            (Field::Revenue, SourceField::Column("매출액")),
            (Field::Opm, SourceField::Column("영업이익")),
            (Field::Earning, SourceField::Column("당기순이익")),
            (Field::Assets, SourceField::Column("자산")),
            (Field::Liabilities, SourceField::Column("부채")),
            (Field::Capital, SourceField::Column("자본")),
            (Field::Cashflow, SourceField::Column("영업활동으로인한현금흐름")),
            (Field::Type, SourceField::Column("type")),
        ],
        required: &[Field::Ticker, Field::Tdate],
        fixups: &[
            Fixup::MonthEnd(Field::Tdate),
            Fixup::Numeric(Field::Revenue),
            Fixup::Numeric(Field::Opm),
            Fixup::Numeric(Field::Earning),
            Fixup::Numeric(Field::Assets),
            Fixup::Numeric(Field::Liabilities),
            Fixup::Numeric(Field::Capital),
            Fixup::Numeric(Field::Cashflow),
        ],
        dedup: false,
    },
    SourceSpec {
        id: SourceId::Consensus,
        url_template: "https://comp.fnguide.com/SVO2/ASP/SVD_Consensus.asp?pGB=1&gicode=A{ticker}",
        render: RenderMode::ScriptRendered,
        pagination: Pagination::Single,
        max_pages: None,
        format: PayloadFormat::HtmlTable(TableLayout {
            index: CONSENSUS_TABLE,
            guard: &["제공처", "추정일자", "목표가", "투자의견"],
            columns: Some(&[
                "source",
                "tdate",
                "ct_price",
                "lt_price",
                "change_ratio",
                "opinion",
                "l_opinion",
            ]),
        }),
        columns: &[
            (Field::Ticker, SourceField::Ticker),
            (Field::Source, SourceField::Column("source")),
            (Field::Tdate, SourceField::Column("tdate")),
            (Field::CtPrice, SourceField::Column("ct_price")),
            (Field::LtPrice, SourceField::Column("lt_price")),
            (Field::ChangeRatio, SourceField::Column("change_ratio")),
            (Field::Opinion, SourceField::Column("opinion")),
            (Field::LOpinion, SourceField::Column("l_opinion")),
        ],
        required: &[Field::Ticker, Field::Tdate],
        fixups: &[
            Fixup::Date(Field::Tdate),
            Fixup::Numeric(Field::CtPrice),
            Fixup::Numeric(Field::LtPrice),
            Fixup::Numeric(Field::ChangeRatio),
        ],
        dedup: false,
    },
];
