use super::*;

/// Mark state for one collection.
struct Tracer {
    marks: Vec<bool>,
    worklist: Vec<u64>,
    seen_envs: FxHashSet<usize>,
}

impl Tracer {
    fn value(&mut self, v: &JsValue) {
        if let JsValue::Object(o) = v {
            self.worklist.push(o.id);
        }
    }

    fn env(&mut self, env: &EnvRef) {
        let mut current = Some(env.clone());
        while let Some(e) = current {
            if !self.seen_envs.insert(Rc::as_ptr(&e) as usize) {
                break;
            }
            let borrowed = e.borrow();
            match &borrowed.record {
                EnvironmentRecord::Declarative(bindings) => {
                    for binding in bindings.values() {
                        self.value(&binding.value);
                    }
                }
                EnvironmentRecord::Object { object, .. } => self.worklist.push(object.id),
            }
            current = borrowed.parent.clone();
        }
    }

    fn object(&mut self, obj: &JsObjectData) {
        if let Some(proto) = obj.prototype {
            self.worklist.push(proto.id);
        }
        for desc in obj.properties.values() {
            for v in [&desc.value, &desc.get, &desc.set].into_iter().flatten() {
                self.value(v);
            }
        }
        if let Some(v) = &obj.primitive_value {
            self.value(v);
        }
        match &obj.callable {
            Some(JsFunction::User { scope, .. }) => self.env(scope),
            Some(JsFunction::Bound { target, this, args }) => {
                self.worklist.push(target.id);
                self.value(this);
                for a in args {
                    self.value(a);
                }
            }
            _ => {}
        }
        if let Some(map) = &obj.parameter_map {
            for (env, _) in map.values() {
                self.env(env);
            }
        }
    }
}

impl Interpreter {
    pub(crate) fn alloc(&mut self, data: JsObjectData) -> JsObject {
        let obj = Rc::new(RefCell::new(data));
        let o = JsObject {
            id: self.allocate_object_slot(obj),
        };
        self.gc_temp_roots.push(JsValue::Object(o));
        o
    }

    fn allocate_object_slot(&mut self, obj: Rc<RefCell<JsObjectData>>) -> u64 {
        self.gc_alloc_count += 1;
        let id = if let Some(idx) = self.free_list.pop() {
            self.objects[idx] = Some(obj.clone());
            idx as u64
        } else {
            let idx = self.objects.len();
            self.objects.push(Some(obj.clone()));
            idx as u64
        };
        obj.borrow_mut().id = Some(id);
        id
    }

    /// Collects once enough objects were allocated. Runs at statement
    /// boundaries, at any call depth: values the Rust frames of unfinished
    /// statements still hold are on `gc_temp_roots` (see `hold`).
    pub(crate) fn maybe_gc(&mut self) {
        let threshold = self.config.gc_threshold;
        if threshold == 0 || self.gc_alloc_count < threshold {
            return;
        }
        self.collect_garbage();
    }

    /// Full mark-sweep; returns the number of freed objects.
    pub(crate) fn collect_garbage(&mut self) -> usize {
        self.gc_alloc_count = 0;
        let obj_count = self.objects.len();
        let mut tracer = Tracer {
            marks: vec![false; obj_count],
            worklist: Vec::new(),
            seen_envs: FxHashSet::default(),
        };

        let r = &self.realm;
        tracer.worklist.extend(
            [
                r.object_prototype,
                r.function_prototype,
                r.array_prototype,
                r.string_prototype,
                r.boolean_prototype,
                r.number_prototype,
                r.date_prototype,
                r.regexp_prototype,
                r.throw_type_error,
                r.eval_function,
                r.global_object,
            ]
            .iter()
            .chain(r.error_prototypes.iter())
            .map(|o| o.id),
        );
        tracer.env(&self.global_env);
        for ctx in &self.contexts {
            tracer.env(&ctx.lexical_env);
            tracer.env(&ctx.variable_env);
            tracer.value(&ctx.this_value);
        }
        for v in &self.gc_temp_roots {
            tracer.value(v);
        }
        tracer
            .worklist
            .extend(self.host_roots.iter().chain(&self.kept_roots).map(|o| o.id));

        while let Some(id) = tracer.worklist.pop() {
            let idx = id as usize;
            if idx >= obj_count || tracer.marks[idx] {
                continue;
            }
            tracer.marks[idx] = true;
            let obj_rc = match &self.objects[idx] {
                Some(rc) => rc.clone(),
                None => continue,
            };
            tracer.object(&obj_rc.borrow());
        }

        let mut freed = 0;
        for i in 0..obj_count {
            if !tracer.marks[i] && self.objects[i].is_some() {
                self.objects[i] = None;
                self.free_list.push(i);
                freed += 1;
            }
        }
        tracing::debug!(freed, live = obj_count - self.free_list.len(), "gc");
        freed
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    /// Runs `f` with a fresh temporary root slot, released on return.
    pub(crate) fn rooted<T>(&mut self, f: impl FnOnce(&mut Self, usize) -> T) -> T {
        let slot = self.gc_temp_roots.len();
        self.gc_temp_roots.push(JsValue::Undefined);
        let result = f(self, slot);
        self.gc_temp_roots.truncate(slot);
        result
    }

    pub(crate) fn set_root(&mut self, slot: usize, v: Option<&JsValue>) {
        self.gc_temp_roots[slot] = v.cloned().unwrap_or(JsValue::Undefined);
    }

    /// Roots `v` until the statement being executed finishes. Allocation,
    /// expression results, property reads and call results all pass through
    /// here, so a value a Rust frame keeps across a call into script code
    /// cannot be swept.
    pub(crate) fn hold(&mut self, v: &JsValue) {
        if v.is_object() {
            self.gc_temp_roots.push(v.clone());
        }
    }

    pub(crate) fn held_mark(&self) -> usize {
        self.gc_temp_roots.len()
    }

    /// Drops the values held since `mark`.
    pub(crate) fn release_held(&mut self, mark: usize) {
        self.gc_temp_roots.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    fn interp_with_threshold(threshold: usize) -> Interpreter {
        Interpreter::new(EngineConfig {
            gc_threshold: threshold,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn unreachable_cycles_are_freed() {
        let mut interp = interp_with_threshold(0);
        eval_in(&mut interp, "1").unwrap();
        interp.collect_garbage();
        let baseline = interp.live_objects();
        eval_in(
            &mut interp,
            "for (var i = 0; i < 100; i++) { var a = {}; var b = {a: a}; a.b = b; } a = b = null;",
        )
        .unwrap();
        assert!(interp.live_objects() > baseline);
        interp.collect_garbage();
        assert_eq!(interp.live_objects(), baseline);
    }

    #[test]
    fn closures_keep_their_environment_alive() {
        let mut interp = interp_with_threshold(0);
        eval_in(
            &mut interp,
            "var get = (function() { var hidden = {v: 42}; return function() { return hidden.v; }; })();",
        )
        .unwrap();
        interp.collect_garbage();
        let v = eval_in(&mut interp, "get()").unwrap();
        assert_eq!(v.to_string(), "42");
    }

    #[test]
    fn collection_during_loops_keeps_live_values() {
        let mut interp = interp_with_threshold(16);
        let v = eval_in(
            &mut interp,
            "var keep = []; for (var i = 0; i < 500; i++) { keep.push({n: i}); var junk = [1, 2, 3]; }\
             var sum = 0; for (var k in keep) { var t = {}; sum += keep[k].n; } sum",
        )
        .unwrap();
        assert_eq!(v.to_string(), "124750");
    }

    #[test]
    fn collection_runs_inside_function_calls() {
        let mut interp = interp_with_threshold(16);
        eval_in(&mut interp, "1").unwrap();
        interp.collect_garbage();
        let baseline = interp.live_objects();
        let v = eval_in(
            &mut interp,
            "(function() {\
               var keep = [];\
               for (var i = 0; i < 2000; i++) { var a = {}; a.self = a; if (i % 100 == 0) keep.push({n: i}); }\
               var sum = 0; for (var k = 0; k < keep.length; k++) sum += keep[k].n;\
               return sum;\
             })()",
        )
        .unwrap();
        assert_eq!(v.to_string(), "19000");
        let live = interp.live_objects();
        assert!(live < baseline + 100, "{live} live objects, baseline {baseline}");
    }

    #[test]
    fn temporaries_survive_collection_inside_calls() {
        let mut interp = interp_with_threshold(1);
        let v = eval_in(
            &mut interp,
            "function mk(n) { for (var i = 0; i < 20; i++) { var junk = {}; junk.me = junk; } return {v: n}; }\
             (function() {\
               var r = [mk(1), mk(2), {w: mk(3)}];\
               var s = {valueOf: function() { mk(0); return 10; }};\
               return r[0].v + r[1].v + r[2].w.v + mk(4).v + [mk(5)].concat([mk(6)])[1].v + (s + mk(7).v);\
             })()",
        )
        .unwrap();
        assert_eq!(v.to_string(), "33");
        let v = eval_in(
            &mut interp,
            "[3, 1, 2].map(function(x) { mk(x); return {x: x}; })\
               .sort(function(a, b) { mk(0); return a.x - b.x; })\
               .map(function(o) { return o.x; }).join()",
        )
        .unwrap();
        assert_eq!(v.to_string(), "1,2,3");
    }

    #[test]
    fn completion_value_survives_collection() {
        let mut interp = interp_with_threshold(1);
        let v = eval_in(&mut interp, "({tag: 'kept'}); var x = [1, 2]; var y = {};").unwrap();
        let o = v.as_object().expect("object completion");
        assert_eq!(
            interp.obj(o).borrow().get_property_value("tag").map(|t| t.to_string()),
            Some("kept".to_string())
        );
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut interp = interp_with_threshold(0);
        eval_in(&mut interp, "var t = {}; t = null;").unwrap();
        let before = interp.objects.len();
        interp.collect_garbage();
        eval_in(&mut interp, "var u = {};").unwrap();
        assert_eq!(interp.objects.len(), before);
    }
}
