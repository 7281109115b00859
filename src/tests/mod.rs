#[cfg(test)]
mod inspection_tests {
    use std::sync::Arc;

    use crate::{
        get_attributes, get_details, is_valid_in_template, AccessError, DisplayValue, Inspect,
        Routine, Value, META_CLASS_NAME, META_MODULE_NAME,
    };

    // Mirrors a model class with one member of every kind the filter cares about
    struct TestClass;

    impl Inspect for TestClass {
        fn module_name(&self) -> Option<String> {
            Some("app.tests".to_string())
        }

        fn class_name(&self) -> Option<String> {
            Some("TestClass".to_string())
        }

        fn member_names(&self) -> Vec<String> {
            ["_private", "takes_args", "alters_data", "valid_method", "has_kwargs"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        }

        fn member(&self, name: &str) -> Result<Value, AccessError> {
            let routine = match name {
                "_private" => Routine::method("_private"),
                "takes_args" => Routine::method("takes_args").arg("x"),
                "alters_data" => Routine::method("alters_data").altering_data(),
                "valid_method" => Routine::method("valid_method"),
                "has_kwargs" => Routine::method("has_kwargs").optional_arg("foobars"),
                _ => return Err(AccessError::Missing(name.to_string())),
            };
            Ok(Value::routine(routine))
        }
    }

    struct Group;

    impl Inspect for Group {
        fn class_name(&self) -> Option<String> {
            Some("ManyRelatedManager".to_string())
        }

        fn member_names(&self) -> Vec<String> {
            vec![]
        }

        fn member(&self, name: &str) -> Result<Value, AccessError> {
            Err(AccessError::Missing(name.to_string()))
        }
    }

    struct User {
        groups: Arc<Group>,
    }

    impl Inspect for User {
        fn module_name(&self) -> Option<String> {
            Some("django.contrib.auth.models".to_string())
        }

        fn class_name(&self) -> Option<String> {
            Some("User".to_string())
        }

        fn member_names(&self) -> Vec<String> {
            ["username", "get_full_name", "groups", "objects", "_state", "save", "check_password"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        }

        fn member(&self, name: &str) -> Result<Value, AccessError> {
            match name {
                "username" => Ok(Value::from("test")),
                "get_full_name" => Ok(Value::routine(Routine::method("get_full_name"))),
                "groups" => Ok(Value::Object(self.groups.clone())),
                // Managers aren't accessible via model instances
                "objects" => Err(AccessError::Raised {
                    name: name.to_string(),
                    message: "Manager isn't accessible via User instances".to_string(),
                }),
                "_state" => Ok(Value::Null),
                "save" => Ok(Value::routine(Routine::method("save").altering_data())),
                "check_password" => Ok(Value::routine(Routine::method("check_password").arg("raw"))),
                _ => Err(AccessError::Missing(name.to_string())),
            }
        }
    }

    fn user() -> User {
        User {
            groups: Arc::new(Group),
        }
    }

    #[test]
    fn test_private() {
        assert!(!is_valid_in_template(&TestClass, "_private"));
    }

    #[test]
    fn test_takes_args() {
        assert!(!is_valid_in_template(&TestClass, "takes_args"));
    }

    #[test]
    fn test_alters_data() {
        assert!(!is_valid_in_template(&TestClass, "alters_data"));
    }

    #[test]
    fn test_valid_method() {
        assert!(is_valid_in_template(&TestClass, "valid_method"));
    }

    #[test]
    fn test_has_kwargs() {
        assert!(is_valid_in_template(&TestClass, "has_kwargs"));
    }

    #[test]
    fn test_unknown_member_is_invalid() {
        assert!(!is_valid_in_template(&TestClass, "missing"));
    }

    #[test]
    fn test_valid_list() {
        assert_eq!(get_attributes(&TestClass), vec!["has_kwargs", "valid_method"]);
    }

    #[test]
    fn test_invalid_managers_hidden() {
        let details = get_details(&user());
        let unreadable: Vec<String> = user()
            .member_names()
            .into_iter()
            .filter(|name| user().member(name).is_err())
            .collect();
        assert!(!unreadable.is_empty());
        assert!(unreadable.iter().all(|name| !details.contains_key(name)));
    }

    #[test]
    fn test_no_private_keys() {
        let details = get_details(&user());
        assert!(details.keys().all(|key| !key.starts_with('_')));
        assert!(!details.contains_key("save"));
        assert!(!details.contains_key("check_password"));
    }

    #[test]
    fn test_set_value_method() {
        let details = get_details(&user());
        assert_eq!(details.get("get_full_name"), Some(&DisplayValue::Routine));
    }

    #[test]
    fn test_set_value_managers() {
        let details = get_details(&user());
        assert_eq!(
            details.get("groups"),
            Some(&DisplayValue::Label("ManyRelatedManager".to_string()))
        );
        assert_eq!(details.get("username"), Some(&DisplayValue::Value(Value::from("test"))));
    }

    #[test]
    fn test_module_and_class_added() {
        let details = get_details(&user());
        assert_eq!(
            details.get(META_MODULE_NAME),
            Some(&DisplayValue::Value(Value::from("django.contrib.auth.models")))
        );
        assert_eq!(details.class_name(), Some("User"));
    }

    #[test]
    fn test_get_details_native_routines() {
        // Native routines have no signature to inspect and are still listed
        let details = get_details(&Value::Bool(true));
        assert_eq!(details.get("bit_length"), Some(&DisplayValue::Routine));
        assert!(details.contains_key(META_CLASS_NAME));
    }

    #[test]
    fn test_details_are_idempotent() {
        let u = user();
        assert_eq!(get_details(&u), get_details(&u));
        assert_eq!(get_attributes(&u), get_attributes(&u));
    }
}

#[cfg(test)]
mod tag_tests {
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use anyhow::anyhow;

    use crate::tags::MockDebugger;
    use crate::{
        Bindings, Captured, ConsoleDebugger, DebugSettings, DebugTags, Debugger, InspectionRecord, Layer,
        RemoteDebugger, RenderingContext, Routine, TagLibrary, TagOutput, Value,
    };

    fn create_test_context() -> RenderingContext {
        let mut user = Layer::new();
        user.insert("user".to_string(), Value::from(serde_json::json!({"username": "ann", "_id": 4})));
        user.insert("request".to_string(), Value::from("GET /foo/"));
        let mut view = Layer::new();
        view.insert("a".to_string(), Value::Int(3));
        view.insert("block".to_string(), Value::Null);
        RenderingContext::from_layers(vec![Layer::new(), user, view])
    }

    fn create_tags(enabled: bool) -> DebugTags<Vec<u8>> {
        let settings = DebugSettings {
            template_debug: enabled,
            ..DebugSettings::default()
        };
        DebugTags::with_output(settings, Vec::new())
    }

    fn printed(tags: DebugTags<Vec<u8>>) -> String {
        String::from_utf8(tags.into_output()).unwrap()
    }

    #[test]
    fn test_empty_if_template_debug_false() {
        let ctx = create_test_context();
        let mut tags = create_tags(false);

        assert!(tags.variables(&ctx).is_empty());
        assert!(tags.attributes(&Value::Int(1)).is_empty());
        assert_eq!(tags.details(&Value::Int(1)), InspectionRecord::default());
        assert_eq!(tags.find(&Value::routine(Routine::function("f").defined_at("f.py", 1))), None);
        assert_eq!(tags.set_trace(&ctx), "");
        assert_eq!(tags.remote_trace(&ctx), "");
        assert_eq!(printed(tags), "");
    }

    #[test]
    fn test_variables_prints_and_returns() {
        let ctx = create_test_context();
        let mut tags = create_tags(true);

        assert_eq!(tags.variables(&ctx), vec!["a", "request", "user"]);
        assert_eq!(printed(tags), "['a', 'request', 'user']\n");
    }

    #[test]
    fn test_details_prints_metadata_first() {
        let ctx = create_test_context();
        let mut tags = create_tags(true);

        let record = tags.details(ctx.get("user").unwrap());
        assert!(record.contains_key("username"));
        assert!(!record.contains_key("_id"));
        assert_eq!(printed(tags), "Class name: dict\n{'username': 'ann'}\n");
    }

    #[test]
    fn test_long_lists_wrap_one_per_line() {
        let names: Vec<String> = (0..12).map(|i| format!("variable_{:02}", i)).collect();
        let layer: Layer = names.iter().map(|n| (n.clone(), Value::Null)).collect();
        let ctx = RenderingContext::from_layers(vec![layer]);
        let mut tags = create_tags(true);

        tags.variables(&ctx);
        let output = printed(tags);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "['variable_00',");
        assert_eq!(lines[1], " 'variable_01',");
        assert_eq!(lines[11], " 'variable_11']");
    }

    #[test]
    fn test_find_strips_root_path() {
        let settings = DebugSettings {
            template_debug: true,
            root_path: Some("/srv/site".into()),
            ..DebugSettings::default()
        };
        let mut tags = DebugTags::with_output(settings, Vec::new());

        let view = Routine::function("home").arg("request").defined_at("/srv/site/app/views.py", 7);
        let decorated = Routine::function("home")
            .variadic("args")
            .closing_over(Captured::Value(Value::from("login")))
            .closing_over(Captured::Routine(Arc::new(view)));

        let found = tags.find(&Value::routine(decorated)).unwrap();
        assert_eq!(found.to_string(), "home:app/views.py:7");
        assert_eq!(printed(tags), "'home:app/views.py:7'\n");
    }

    #[test]
    fn test_set_trace_binds_every_variable() {
        let ctx = create_test_context();
        let mut debugger = MockDebugger::new();
        debugger
            .expect_set_trace()
            .withf(|bindings| {
                bindings.keys().cloned().collect::<Vec<_>>() == vec!["a", "request", "user"]
                    && bindings.get("a") == Some(&Value::Int(3))
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut tags = create_tags(true).with_debugger(debugger);
        assert_eq!(tags.set_trace(&ctx), "");

        let output = printed(tags);
        assert!(output.starts_with("Variables that are available in the current context:\n"));
        assert!(output.contains("['a', 'request', 'user']\n"));
        assert!(output.contains("Type `availables` to show this list."));
    }

    #[test]
    fn test_set_trace_survives_debugger_errors() {
        let mut debugger = MockDebugger::new();
        debugger
            .expect_set_trace()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        let mut tags = create_tags(true).with_debugger(debugger);
        assert_eq!(tags.set_trace(&create_test_context()), "");
    }

    #[test]
    fn test_console_debugger_session() {
        let ctx = create_test_context();
        let bindings: Bindings = ctx
            .layers()
            .iter()
            .flat_map(|layer| layer.iter().map(|(k, v)| (k.clone(), v.clone())))
            .filter(|(k, _)| k != "block")
            .collect();

        let input = Cursor::new("availables\nuser.username\nnope\n\nc\nnever read\n");
        let mut debugger = ConsoleDebugger::new(input, Vec::new(), vec![]);
        debugger.set_trace(&bindings).unwrap();

        let output = String::from_utf8(debugger.into_output()).unwrap();
        assert!(output.contains("['a', 'request', 'user']\n"));
        assert!(output.contains("'ann'\n  Class name: str\n  {'lower': 'routine', 'upper': 'routine'}\n"));
        assert!(output.contains("*** unknown variable: nope\n"));
        assert_eq!(output.matches("(tdb) ").count(), 5);
    }

    #[test]
    fn test_console_debugger_stops_at_eof() {
        let mut debugger = ConsoleDebugger::new(Cursor::new(""), Vec::new(), vec![]);
        debugger.set_trace(&Default::default()).unwrap();
        assert_eq!(String::from_utf8(debugger.into_output()).unwrap(), "(tdb) \n");
    }

    #[test]
    fn test_remote_trace_sends_bindings() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut received = String::new();
            BufReader::new(stream).read_line(&mut received).unwrap();
            writer.write_all(b"continue\n").unwrap();
            received
        });

        let ctx = create_test_context();
        let mut tags = create_tags(true).with_remote(RemoteDebugger::new(address));
        assert_eq!(tags.remote_trace(&ctx), "");

        let received: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(received["a"], "3");
        assert_eq!(received["request"], "'GET /foo/'");
        assert!(received.get("block").is_none());
        assert_eq!(printed(tags), "");
    }

    #[test]
    fn test_remote_debugger_stays_off_after_failed_connect() {
        // Nothing listens once the listener is dropped
        let address = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut debugger = RemoteDebugger::new(address).with_timeout(Duration::from_millis(200));

        assert!(debugger.is_available());
        debugger.set_trace(&Bindings::new()).unwrap();
        assert!(!debugger.is_available());
        debugger.set_trace(&Bindings::new()).unwrap();
        assert!(!debugger.is_available());
    }

    #[test]
    fn test_remote_trace_uses_remote_debugger_only() {
        let ctx = create_test_context();
        let mut remote = MockDebugger::new();
        remote
            .expect_set_trace()
            .withf(|bindings: &Bindings| bindings.contains_key("user") && !bindings.contains_key("block"))
            .times(2)
            .returning(|_| Ok(()));
        let mut console = MockDebugger::new();
        console.expect_set_trace().never();

        let mut tags = create_tags(true).with_debugger(console).with_remote(remote);
        assert_eq!(tags.remote_trace(&ctx), "");
        assert_eq!(tags.remote_trace(&ctx), "");
        assert_eq!(printed(tags), "");
    }

    #[test]
    fn test_remote_trace_without_address_is_a_no_op() {
        let ctx = create_test_context();
        let mut tags = create_tags(true);
        assert_eq!(tags.remote_trace(&ctx), "");
        assert_eq!(printed(tags), "");
    }

    #[test]
    fn test_library_dispatch() {
        let ctx = create_test_context();
        let library = TagLibrary::with_debug_tags();
        let mut tags = create_tags(true);

        assert_eq!(
            library.names(),
            vec!["attributes", "details", "find", "remote_trace", "set_trace", "variables"]
        );

        let output = library.call("variables", &mut tags, &ctx, None).unwrap();
        assert_eq!(output.to_string(), "['a', 'request', 'user']");

        let output = library
            .call("attributes", &mut tags, &ctx, ctx.get("user"))
            .unwrap();
        assert_eq!(output, TagOutput::Names(vec!["username".to_string()]));

        let output = library.call("find", &mut tags, &ctx, ctx.get("a")).unwrap();
        assert_eq!(output.to_string(), "");

        assert!(library.call("pydevd", &mut tags, &ctx, None).is_none());
    }

    #[test]
    fn test_value_tags_without_argument() {
        let ctx = create_test_context();
        let library = TagLibrary::with_debug_tags();
        let mut tags = create_tags(true);

        let output = library.call("details", &mut tags, &ctx, None).unwrap();
        assert_eq!(output, TagOutput::Record(InspectionRecord::default()));
        assert_eq!(printed(tags), "");
    }

    #[test]
    fn test_variables_are_idempotent() {
        let ctx = create_test_context();
        let mut tags = create_tags(true);
        let first = tags.variables(&ctx);
        assert_eq!(first, tags.variables(&ctx));
    }
}
