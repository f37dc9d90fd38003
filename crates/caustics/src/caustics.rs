pub struct Caustics {
    app_name: &'static str,
}

static CAUSTICS_STATIC: std::sync::OnceLock<CausticsStatic> = std::sync::OnceLock::new();

struct CausticsStatic {
    app_name: String,
}

impl CausticsStatic {
    fn init(app_name: &str) -> &'static Self {
        puffin::profile_function!();

        CAUSTICS_STATIC.get_or_init(|| {
            env_logger::builder()
                .filter_level(log::LevelFilter::Info)
                .parse_default_env()
                .init();

            log::debug!("{} started", app_name);
            Self {
                app_name: app_name.to_owned(),
            }
        })
    }
}

impl Caustics {
    /// Initializes logging once per process. Later calls keep the first app name.
    pub fn new(app_name: &str) -> Self {
        let statics = CausticsStatic::init(app_name);

        Self {
            app_name: &statics.app_name,
        }
    }

    pub fn app_name(&self) -> &str {
        self.app_name
    }
}
