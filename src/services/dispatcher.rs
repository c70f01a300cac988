/// Keyword dispatch for incoming text messages
///
/// Routes are evaluated in registration order. The first route whose predicate
/// matches and whose handler produces a reply wins; a handler returning `None`
/// lets later routes try.
type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;
type Handler = Box<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Keyword that asks for an information update
pub const INFO_UPDATE_KEYWORD: &str = "信息更新";

struct Route {
    name: String,
    predicate: Predicate,
    handler: Handler,
}

#[derive(Default)]
pub struct MessageDispatcher {
    routes: Vec<Route>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with the stock routes registered
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register_keyword(INFO_UPDATE_KEYWORD, |_, user_id| {
            log::info!("Info update requested by {}", user_id);
            Some("2".to_string())
        });
        dispatcher
    }

    pub fn register<P, H>(&mut self, name: &str, predicate: P, handler: H)
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        H: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.routes.push(Route {
            name: name.to_string(),
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        });
        log::info!("Registered message handler: {}", name);
    }

    /// Route messages that contain `keyword` as a substring
    pub fn register_keyword<H>(&mut self, keyword: &str, handler: H)
    where
        H: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        let needle = keyword.to_string();
        self.register(keyword, move |text| text.contains(needle.as_str()), handler);
    }

    pub fn dispatch(&self, text: &str, user_id: &str) -> Option<String> {
        for route in &self.routes {
            if !(route.predicate)(text) {
                continue;
            }
            if let Some(reply) = (route.handler)(text, user_id) {
                log::info!("Handler '{}' produced a reply for {}", route.name, user_id);
                return Some(reply);
            }
        }

        log::debug!("No handler matched message from {}", user_id);
        None
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_info_update() {
        let dispatcher = MessageDispatcher::with_defaults();
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(dispatcher.dispatch("请信息更新一下", "alice"), Some("2".to_string()));
        assert_eq!(dispatcher.dispatch("hello", "alice"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register_keyword("price", |_, _| Some("first".to_string()));
        dispatcher.register_keyword("price", |_, _| Some("second".to_string()));
        assert_eq!(dispatcher.dispatch("price of AAPL", "u"), Some("first".to_string()));
    }

    #[test]
    fn test_none_falls_through() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register("silent", |_| true, |_, _| None);
        dispatcher.register("echo", |t| t.starts_with("echo "), |t, _| Some(t[5..].to_string()));
        assert_eq!(dispatcher.dispatch("echo hi", "u"), Some("hi".to_string()));
        assert_eq!(dispatcher.dispatch("nothing", "u"), None);
    }

    #[test]
    fn test_handler_sees_user() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register("whoami", |t| t == "whoami", |_, user| Some(user.to_string()));
        assert_eq!(dispatcher.dispatch("whoami", "bob"), Some("bob".to_string()));
        assert_eq!(dispatcher.route_names(), vec!["whoami"]);
    }
}
