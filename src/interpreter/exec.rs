use super::*;

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Whether an iteration keeps going after its body produced `c`.
fn loop_continues(c: &Completion, labels: &[String]) -> bool {
    match c {
        Completion::Normal(_) | Completion::Continue(None, _) => true,
        Completion::Continue(Some(l), _) => labels.contains(l),
        _ => false,
    }
}

/// The completion a loop returns once its body stopped it.
fn exit_loop(c: Completion, labels: &[String], v: Option<JsValue>) -> Completion {
    match c {
        Completion::Break(None, _) => Completion::Normal(v),
        Completion::Break(Some(l), _) if labels.contains(&l) => Completion::Normal(v),
        other => other.update_empty(v),
    }
}

impl Interpreter {
    /// Runs a statement list, threading the completion value `V`.
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement]) -> Completion {
        self.rooted(|interp, slot| {
            let mut value: Option<JsValue> = None;
            for stmt in stmts {
                interp.maybe_gc();
                let mark = interp.held_mark();
                let c = interp.exec_statement(stmt).update_empty(value.take());
                interp.release_held(mark);
                if c.is_abrupt() {
                    return c;
                }
                value = c.value().cloned();
                interp.set_root(slot, value.as_ref());
            }
            Completion::Normal(value)
        })
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement) -> Completion {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.exec_statement_inner(stmt))
    }

    fn exec_statement_inner(&mut self, stmt: &Statement) -> Completion {
        match stmt {
            Statement::Empty | Statement::Debugger | Statement::FunctionDeclaration(_) => {
                Completion::Normal(None)
            }
            Statement::Expression(e) => self.eval_expr(e).into(),
            Statement::Block(stmts) => self.exec_statements(stmts),
            Statement::Variable(decls) => {
                js_try!(self.exec_var_declarations(decls));
                Completion::Normal(None)
            }
            Statement::If(s) => {
                let test = js_try!(self.eval_expr(&s.test));
                if to_boolean(&test) {
                    self.exec_statement(&s.consequent)
                } else if let Some(alt) = &s.alternate {
                    self.exec_statement(alt)
                } else {
                    Completion::Normal(None)
                }
            }
            Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::ForIn(_) => {
                self.exec_iteration(stmt, &[])
            }
            Statement::Return(arg) => match arg {
                Some(e) => Completion::Return(js_try!(self.eval_expr(e))),
                None => Completion::Return(JsValue::Undefined),
            },
            Statement::Break(label) => Completion::Break(label.clone(), None),
            Statement::Continue(label) => Completion::Continue(label.clone(), None),
            Statement::Throw(e) => Completion::Throw(js_try!(self.eval_expr(e))),
            Statement::Try(t) => self.exec_try(t),
            Statement::Switch(s) => self.exec_switch(s),
            Statement::Labeled(..) => self.exec_labeled(stmt),
            Statement::With(object, body) => {
                let v = js_try!(self.eval_expr(object));
                let o = js_try!(self.to_object(&v));
                let env = Environment::new_object(o, true, Some(self.lexical_env()));
                self.with_lexical_env(env, |interp| interp.exec_statement(body))
            }
        }
    }

    fn exec_var_declarations(&mut self, decls: &[VariableDeclarator]) -> JsResult<()> {
        for decl in decls {
            if let Some(init) = &decl.init {
                let r = self.resolve_identifier(&decl.name);
                let v = self.eval_expr(init)?;
                self.put_value(&r, v)?;
            }
        }
        Ok(())
    }

    fn exec_labeled(&mut self, stmt: &Statement) -> Completion {
        let mut labels = Vec::new();
        let mut inner = stmt;
        while let Statement::Labeled(label, body) = inner {
            labels.push(label.clone());
            inner = body;
        }
        let c = match inner {
            Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::ForIn(_) => {
                self.exec_iteration(inner, &labels)
            }
            other => self.exec_statement(other),
        };
        match c {
            Completion::Break(Some(l), v) if labels.contains(&l) => Completion::Normal(v),
            c => c,
        }
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    fn exec_iteration(&mut self, stmt: &Statement, labels: &[String]) -> Completion {
        self.rooted(|interp, slot| match stmt {
            Statement::While(s) => interp.exec_while(s, labels, slot),
            Statement::DoWhile(s) => interp.exec_do_while(s, labels, slot),
            Statement::For(s) => interp.exec_for(s, labels, slot),
            Statement::ForIn(s) => interp.exec_for_in(s, labels, slot),
            _ => Completion::Normal(None),
        })
    }

    /// Drops what the previous iteration held; the loop's own state lives in
    /// rooted slots below `mark`.
    fn next_iteration(&mut self, mark: usize) {
        self.release_held(mark);
        self.maybe_gc();
    }

    fn exec_while(&mut self, s: &WhileStatement, labels: &[String], slot: usize) -> Completion {
        let mark = self.held_mark();
        let mut v = None;
        loop {
            self.next_iteration(mark);
            let test = js_try!(self.eval_expr(&s.test));
            if !to_boolean(&test) {
                return Completion::Normal(v);
            }
            let c = self.exec_statement(&s.body);
            if let Some(x) = c.value() {
                v = Some(x.clone());
                self.set_root(slot, v.as_ref());
            }
            if !loop_continues(&c, labels) {
                return exit_loop(c, labels, v);
            }
        }
    }

    fn exec_do_while(&mut self, s: &DoWhileStatement, labels: &[String], slot: usize) -> Completion {
        let mark = self.held_mark();
        let mut v = None;
        loop {
            self.next_iteration(mark);
            let c = self.exec_statement(&s.body);
            if let Some(x) = c.value() {
                v = Some(x.clone());
                self.set_root(slot, v.as_ref());
            }
            if !loop_continues(&c, labels) {
                return exit_loop(c, labels, v);
            }
            let test = js_try!(self.eval_expr(&s.test));
            if !to_boolean(&test) {
                return Completion::Normal(v);
            }
        }
    }

    fn exec_for(&mut self, s: &ForStatement, labels: &[String], slot: usize) -> Completion {
        match &s.init {
            Some(ForInit::Variable(decls)) => js_try!(self.exec_var_declarations(decls)),
            Some(ForInit::Expression(e)) => {
                js_try!(self.eval_expr(e));
            }
            None => {}
        }
        let mark = self.held_mark();
        let mut v = None;
        loop {
            self.next_iteration(mark);
            if let Some(test) = &s.test {
                let t = js_try!(self.eval_expr(test));
                if !to_boolean(&t) {
                    return Completion::Normal(v);
                }
            }
            let c = self.exec_statement(&s.body);
            if let Some(x) = c.value() {
                v = Some(x.clone());
                self.set_root(slot, v.as_ref());
            }
            if !loop_continues(&c, labels) {
                return exit_loop(c, labels, v);
            }
            if let Some(update) = &s.update {
                js_try!(self.eval_expr(update));
            }
        }
    }

    fn exec_for_in(&mut self, s: &ForInStatement, labels: &[String], slot: usize) -> Completion {
        if let ForInLeft::Variable(decl) = &s.left {
            js_try!(self.exec_var_declarations(std::slice::from_ref(decl)));
        }
        let subject = js_try!(self.eval_expr(&s.right));
        if subject.is_nullish() {
            return Completion::Normal(None);
        }
        let o = js_try!(self.to_object(&subject));
        self.rooted(|interp, obj_slot| {
            interp.set_root(obj_slot, Some(&JsValue::Object(o)));
            let mark = interp.held_mark();
            let mut v = None;
            for key in interp.for_in_keys(o) {
                interp.next_iteration(mark);
                // properties deleted before being reached are skipped
                if !interp.has_property(o, &key) {
                    continue;
                }
                let r = match &s.left {
                    ForInLeft::Variable(decl) => interp.resolve_identifier(&decl.name),
                    ForInLeft::Expression(e) => js_try!(interp.eval_ref(e)),
                };
                js_try!(interp.put_value(&r, JsValue::String(JsString::from_property_key(&key))));
                let c = interp.exec_statement(&s.body);
                if let Some(x) = c.value() {
                    v = Some(x.clone());
                    interp.set_root(slot, v.as_ref());
                }
                if !loop_continues(&c, labels) {
                    return exit_loop(c, labels, v);
                }
            }
            Completion::Normal(v)
        })
    }

    // ========================================================================
    // switch / try
    // ========================================================================

    fn exec_switch(&mut self, s: &SwitchStatement) -> Completion {
        let discriminant = js_try!(self.eval_expr(&s.discriminant));
        self.rooted(|interp, slot| {
            interp.set_root(slot, Some(&discriminant));
            let mut start = None;
            for (i, case) in s.cases.iter().enumerate() {
                let Some(test) = &case.test else { continue };
                let t = js_try!(interp.eval_expr(test));
                if strict_equals(&discriminant, &t) {
                    start = Some(i);
                    break;
                }
            }
            let Some(start) = start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) else {
                return Completion::Normal(None);
            };
            interp.rooted(|interp, v_slot| {
                let mut v = None;
                for case in &s.cases[start..] {
                    let c = interp.exec_statements(&case.consequent);
                    if let Some(x) = c.value() {
                        v = Some(x.clone());
                        interp.set_root(v_slot, v.as_ref());
                    }
                    match c {
                        Completion::Normal(_) => {}
                        Completion::Break(None, _) => return Completion::Normal(v),
                        other => return other.update_empty(v),
                    }
                }
                Completion::Normal(v)
            })
        })
    }

    fn exec_try(&mut self, t: &TryStatement) -> Completion {
        let block = self.exec_statements(&t.block);
        let c = match (&t.handler, block) {
            (Some(handler), Completion::Throw(e)) => self.exec_catch(handler, e),
            (_, other) => other,
        };
        let Some(finalizer) = &t.finalizer else {
            return c;
        };
        self.rooted(|interp, slot| {
            interp.set_root(slot, c.value());
            match interp.exec_statements(finalizer) {
                Completion::Normal(_) => c,
                abrupt => abrupt,
            }
        })
    }

    fn exec_catch(&mut self, handler: &CatchClause, thrown: JsValue) -> Completion {
        let env = Environment::new_declarative(Some(self.lexical_env()));
        env.borrow_mut()
            .declare(&handler.param, BindingState::MutableUndeletable, thrown);
        self.with_lexical_env(env, |interp| interp.exec_statements(&handler.body))
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn completion_values_thread_through_statements() {
        assert_eq!(eval_str("1; var x = 2;"), "1");
        assert_eq!(eval_str("1; if (true) {}"), "1");
        assert_eq!(eval_str("2; do { 3; break; } while (false)"), "3");
        assert_eq!(eval_str("var i = 0; while (i < 3) { i++; }"), "2");
        assert_eq!(eval_str("eval('1; try { 2; } finally { 3; }')"), "2");
    }

    #[test]
    fn labels_break_and_continue() {
        assert_eq!(
            eval_str(
                "var out = ''; outer: for (var i = 0; i < 3; i++) {\
                   for (var j = 0; j < 3; j++) { if (j == 1) continue outer; if (i == 2) break outer; out += i + '' + j; } }\
                 out"
            ),
            "0010"
        );
        assert_eq!(eval_str("var r = 0; block: { r = 1; break block; r = 2; } r"), "1");
        assert_eq!(
            eval_str("var n = 0; a: b: while (true) { n++; if (n > 2) break a; continue b; } n"),
            "3"
        );
    }

    #[test]
    fn switch_fall_through_and_default() {
        let src = "function s(x) { var r = ''; switch (x) { case 1: r += 'a'; case 2: r += 'b'; break; default: r += 'd'; case 3: r += 'c'; } return r; }";
        assert_eq!(eval_str(&format!("{src} s(1)")), "ab");
        assert_eq!(eval_str(&format!("{src} s(2)")), "b");
        assert_eq!(eval_str(&format!("{src} s(3)")), "c");
        assert_eq!(eval_str(&format!("{src} s(9)")), "dc");
        assert_eq!(eval_str("switch ('1') { case 1: 'loose'; break; default: 'strict'; }"), "strict");
    }

    #[test]
    fn try_catch_finally_ordering() {
        assert_eq!(
            eval_str("var log = []; try { log.push('t'); throw 1; } catch (e) { log.push('c' + e); } finally { log.push('f'); } log.join()"),
            "t,c1,f"
        );
        assert_eq!(eval_str("function f() { try { return 1; } finally { return 2; } } f()"), "2");
        assert_eq!(
            eval_str("function f() { try { throw 1; } finally { return 'swallowed'; } } f()"),
            "swallowed"
        );
        assert_eq!(
            eval_str("var e = 'outer'; try { throw 'inner'; } catch (e) { } e"),
            "outer"
        );
        assert_eq!(
            eval_str("var r; try { throw 1; } catch (e) { var e = 2; r = e; } r + ':' + e"),
            "2:undefined"
        );
    }

    #[test]
    fn for_in_semantics() {
        assert_eq!(
            eval_str("var o = {a: 1, b: 2, c: 3}; var ks = []; for (var k in o) { delete o.b; ks.push(k); } ks.join()"),
            "a,c"
        );
        assert_eq!(eval_str("var n = 0; for (var k in null) n++; n"), "0");
        assert_eq!(eval_str("var ks = ''; for (var k in 'ab') ks += k; ks"), "01");
        assert_eq!(
            eval_str("var o = {}; for (o.k in {x: 1}); o.k"),
            "x"
        );
        assert_eq!(eval_str("for (var i = 7 in {}); i"), "7");
        assert_eq!(eval_str("var ks = []; for (var k in [5, 6]) ks.push(typeof k); ks.join()"), "string,string");
    }

    #[test]
    fn with_statement_restores_scope() {
        assert_eq!(
            eval_str("var x = 1; try { with ({x: 2}) { throw x; } } catch (e) { e + ':' + x }"),
            "2:1"
        );
    }
}
