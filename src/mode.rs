//! The menu of each experiment program, and what each entry runs.

use std::fmt;

use crate::config::{CounterConfig, PointerConfig, PublishConfig, StoreBufferConfig};
use crate::error::{ConfigError, Result};
use crate::report::Report;
use crate::runner::{
    run_counter_race, run_pointer_publish, run_publish_race, run_store_buffer_race, Echo,
};
use crate::strategy::{
    CasCounter, FetchAddCounter, LoadStoreCounter, PublishOrdering, RacyCounter,
    StoreBufferOrdering,
};

/// One selectable mode of an experiment family.
pub trait Mode: Sized + Copy + fmt::Debug {
    const FAMILY: &'static str;
    /// Menu entry `i` describes mode `i`.
    const MENU: &'static [&'static str];

    type Config: Default;

    fn from_index(index: i64) -> Result<Self, ConfigError>;

    fn run(self, config: &Self::Config, echo: Echo) -> Result<Report>;
}

/// Parses one line of user input as a mode number and looks it up.
pub fn parse_mode<M: Mode>(input: &str) -> Result<M, ConfigError> {
    let input = input.trim();
    let index = input
        .parse::<i64>()
        .map_err(|source| ConfigError::Unparsable {
            input: input.to_owned(),
            source,
        })?;
    M::from_index(index)
}

fn unknown<M: Mode>(index: i64) -> ConfigError {
    ConfigError::UnknownMode {
        family: M::FAMILY,
        index,
        max: M::MENU.len() as i64 - 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    Unsynchronized,
    RelaxedLoadStore,
    CompareExchange,
    FetchAdd,
}

impl Mode for CounterMode {
    const FAMILY: &'static str = "counter race";
    const MENU: &'static [&'static str] = &[
        "w/o atomics",
        "with atomic load/store",
        "with compare-and-swap",
        "with fetch-add",
    ];

    type Config = CounterConfig;

    fn from_index(index: i64) -> Result<Self, ConfigError> {
        match index {
            0 => Ok(CounterMode::Unsynchronized),
            1 => Ok(CounterMode::RelaxedLoadStore),
            2 => Ok(CounterMode::CompareExchange),
            3 => Ok(CounterMode::FetchAdd),
            _ => Err(unknown::<Self>(index)),
        }
    }

    fn run(self, config: &CounterConfig, _echo: Echo) -> Result<Report> {
        let run = match self {
            CounterMode::Unsynchronized => run_counter_race::<RacyCounter>(config)?,
            CounterMode::RelaxedLoadStore => run_counter_race::<LoadStoreCounter>(config)?,
            CounterMode::CompareExchange => run_counter_race::<CasCounter>(config)?,
            CounterMode::FetchAdd => run_counter_race::<FetchAddCounter>(config)?,
        };
        Ok(Report::Counter(run))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    Relaxed,
    ReleaseAcquire,
}

impl PointerMode {
    pub fn ordering(self) -> PublishOrdering {
        match self {
            PointerMode::Relaxed => PublishOrdering::Relaxed,
            PointerMode::ReleaseAcquire => PublishOrdering::ReleaseAcquire,
        }
    }
}

impl Mode for PointerMode {
    const FAMILY: &'static str = "pointer publish";
    const MENU: &'static [&'static str] = &[
        "w/o release/acquire on the pointer",
        "with release/acquire on the pointer",
    ];

    type Config = PointerConfig;

    fn from_index(index: i64) -> Result<Self, ConfigError> {
        match index {
            0 => Ok(PointerMode::Relaxed),
            1 => Ok(PointerMode::ReleaseAcquire),
            _ => Err(unknown::<Self>(index)),
        }
    }

    fn run(self, config: &PointerConfig, echo: Echo) -> Result<Report> {
        run_pointer_publish(self.ordering(), config, echo).map(Report::Pointer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Relaxed,
    ReleaseAcquire,
    RelaxedWithFences,
}

impl PublishMode {
    pub fn ordering(self) -> PublishOrdering {
        match self {
            PublishMode::Relaxed => PublishOrdering::Relaxed,
            PublishMode::ReleaseAcquire => PublishOrdering::ReleaseAcquire,
            PublishMode::RelaxedWithFences => PublishOrdering::Fenced,
        }
    }
}

impl Mode for PublishMode {
    const FAMILY: &'static str = "publish race";
    const MENU: &'static [&'static str] = &[
        "w/o release/acquire fences",
        "with release/acquire fences",
        "with relaxed and additional release/acquire fences",
    ];

    type Config = PublishConfig;

    fn from_index(index: i64) -> Result<Self, ConfigError> {
        match index {
            0 => Ok(PublishMode::Relaxed),
            1 => Ok(PublishMode::ReleaseAcquire),
            2 => Ok(PublishMode::RelaxedWithFences),
            _ => Err(unknown::<Self>(index)),
        }
    }

    fn run(self, config: &PublishConfig, echo: Echo) -> Result<Report> {
        run_publish_race(self.ordering(), config, echo).map(Report::Publish)
    }
}

/// Modes 1 and 2 are listed but have no implementation; selecting them is a
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBufferMode {
    ReleaseAcquire,
    SequentiallyConsistent,
}

impl StoreBufferMode {
    pub fn ordering(self) -> StoreBufferOrdering {
        match self {
            StoreBufferMode::ReleaseAcquire => StoreBufferOrdering::ReleaseAcquire,
            StoreBufferMode::SequentiallyConsistent => StoreBufferOrdering::SeqCst,
        }
    }
}

impl Mode for StoreBufferMode {
    const FAMILY: &'static str = "store buffer race";
    const MENU: &'static [&'static str] = &[
        "w/o release/acquire fences",
        "with fences (not implemented)",
        "with additional fences (not implemented)",
        "with sequentially consistent stores and loads",
    ];

    type Config = StoreBufferConfig;

    fn from_index(index: i64) -> Result<Self, ConfigError> {
        match index {
            0 => Ok(StoreBufferMode::ReleaseAcquire),
            1 => Err(ConfigError::Unimplemented {
                family: Self::FAMILY,
                index,
                name: "with fences",
            }),
            2 => Err(ConfigError::Unimplemented {
                family: Self::FAMILY,
                index,
                name: "with additional fences",
            }),
            3 => Ok(StoreBufferMode::SequentiallyConsistent),
            _ => Err(unknown::<Self>(index)),
        }
    }

    fn run(self, config: &StoreBufferConfig, _echo: Echo) -> Result<Report> {
        run_store_buffer_race(self.ordering(), config).map(Report::StoreBuffer)
    }
}

#[test]
fn every_menu_entry_maps_to_a_mode() {
    assert_eq!(parse_mode::<CounterMode>("0\n").unwrap(), CounterMode::Unsynchronized);
    assert_eq!(parse_mode::<CounterMode>(" 3 ").unwrap(), CounterMode::FetchAdd);
    assert_eq!(parse_mode::<PointerMode>("1").unwrap(), PointerMode::ReleaseAcquire);
    assert_eq!(
        parse_mode::<PublishMode>("2").unwrap().ordering(),
        PublishOrdering::Fenced
    );
    assert_eq!(
        parse_mode::<StoreBufferMode>("3").unwrap().ordering(),
        StoreBufferOrdering::SeqCst
    );
}

#[test]
fn out_of_range_modes_are_rejected() {
    assert!(matches!(
        parse_mode::<CounterMode>("4"),
        Err(ConfigError::UnknownMode { index: 4, max: 3, .. })
    ));
    assert!(matches!(
        parse_mode::<PointerMode>("-1"),
        Err(ConfigError::UnknownMode { index: -1, max: 1, .. })
    ));
    assert!(matches!(
        parse_mode::<PublishMode>("3"),
        Err(ConfigError::UnknownMode { .. })
    ));
}

#[test]
fn garbage_input_is_rejected() {
    let err = parse_mode::<CounterMode>("two").unwrap_err();
    assert!(matches!(err, ConfigError::Unparsable { ref input, .. } if input == "two"));
    assert!(parse_mode::<CounterMode>("").is_err());
}

#[test]
fn store_buffer_stubs_are_unimplemented() {
    for index in ["1", "2"] {
        assert!(matches!(
            parse_mode::<StoreBufferMode>(index),
            Err(ConfigError::Unimplemented { .. })
        ));
    }
}

#[test]
fn modes_dispatch_to_their_runner() {
    let report = CounterMode::CompareExchange
        .run(
            &CounterConfig::default().with_threads(2).with_iterations(1_000),
            Echo::Silent,
        )
        .unwrap();
    match report {
        Report::Counter(run) => {
            assert_eq!(run.strategy, "compare-and-swap");
            assert_eq!(run.total, 2_000);
        }
        other => panic!("unexpected report {other:?}"),
    }

    let report = PublishMode::RelaxedWithFences
        .run(&PublishConfig::default().with_iterations(1_000), Echo::Silent)
        .unwrap();
    assert!(matches!(report, Report::Publish(run) if !run.saw_stale_read));
}
