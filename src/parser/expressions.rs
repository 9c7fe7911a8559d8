use super::*;
use crate::types::number_ops;

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_assignment_expression()?;
        if self.current == Token::Comma {
            let mut exprs = vec![expr];
            while self.current == Token::Comma {
                self.advance()?;
                exprs.push(self.parse_assignment_expression()?);
            }
            Ok(Expression::Sequence(exprs))
        } else {
            Ok(expr)
        }
    }

    /// Runs `f` with the `in` operator re-enabled (inside brackets, parens, bodies).
    fn allowing_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved_no_in;
        result
    }

    /// Calls are accepted as targets and fail with a ReferenceError at run time.
    pub(super) fn validate_assignment_target(&self, expr: &Expression) -> Result<(), ParseError> {
        match expr {
            Expression::Identifier(name) => {
                if self.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error("Assignment to 'eval' or 'arguments' in strict mode"));
                }
                Ok(())
            }
            Expression::Member(..) | Expression::Call(..) => Ok(()),
            _ => Err(self.error("Invalid left-hand side in assignment")),
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || {
            self.parse_assignment_expression_inner()
        })
    }

    fn parse_assignment_expression_inner(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional_expression()?;

        let op = match &self.current {
            Token::Assign => Some(AssignOp::Assign),
            Token::PlusAssign => Some(AssignOp::AddAssign),
            Token::MinusAssign => Some(AssignOp::SubAssign),
            Token::StarAssign => Some(AssignOp::MulAssign),
            Token::SlashAssign => Some(AssignOp::DivAssign),
            Token::PercentAssign => Some(AssignOp::ModAssign),
            Token::LeftShiftAssign => Some(AssignOp::LShiftAssign),
            Token::RightShiftAssign => Some(AssignOp::RShiftAssign),
            Token::UnsignedRightShiftAssign => Some(AssignOp::URShiftAssign),
            Token::AmpersandAssign => Some(AssignOp::BitAndAssign),
            Token::PipeAssign => Some(AssignOp::BitOrAssign),
            Token::CaretAssign => Some(AssignOp::BitXorAssign),
            _ => None,
        };

        if let Some(op) = op {
            self.validate_assignment_target(&left)?;
            self.advance()?;
            let right = self.parse_assignment_expression()?;
            Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
        } else {
            Ok(left)
        }
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_logical_or()?;
        if self.current == Token::Question {
            self.advance()?;
            let consequent = self.allowing_in(|p| p.parse_assignment_expression())?;
            self.eat(&Token::Colon)?;
            let alternate = self.parse_assignment_expression()?;
            Ok(Expression::Conditional(
                Box::new(expr),
                Box::new(consequent),
                Box::new(alternate),
            ))
        } else {
            Ok(expr)
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.current == Token::LogicalOr {
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_bitwise_xor()?;
            left = Expression::Binary(BinaryOp::BitOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.current == Token::Caret {
            self.advance()?;
            let right = self.parse_bitwise_and()?;
            left = Expression::Binary(BinaryOp::BitXor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.current == Token::Ampersand {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expression::Binary(BinaryOp::BitAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match &self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match &self.current {
                Token::LessThan => BinaryOp::Lt,
                Token::GreaterThan => BinaryOp::Gt,
                Token::LessThanEqual => BinaryOp::LtEq,
                Token::GreaterThanEqual => BinaryOp::GtEq,
                Token::Keyword(Keyword::Instanceof) => BinaryOp::Instanceof,
                Token::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_shift()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.current {
                Token::LeftShift => BinaryOp::LShift,
                Token::RightShift => BinaryOp::RShift,
                Token::UnsignedRightShift => BinaryOp::URShift,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::Delete) => {
                self.advance()?;
                let expr = self.parse_unary()?;
                if self.strict && matches!(&expr, Expression::Identifier(_)) {
                    return Err(self.error("Delete of an unqualified identifier in strict mode"));
                }
                Ok(Expression::Delete(Box::new(expr)))
            }
            Token::Keyword(Keyword::Void) => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Void(Box::new(expr)))
            }
            Token::Keyword(Keyword::Typeof) => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Typeof(Box::new(expr)))
            }
            Token::Plus => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::Plus, Box::new(expr)))
            }
            Token::Minus => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::Minus, Box::new(expr)))
            }
            Token::Tilde => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::BitNot, Box::new(expr)))
            }
            Token::Bang => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary(UnaryOp::Not, Box::new(expr)))
            }
            Token::Increment | Token::Decrement => {
                let op = if self.current == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let expr = self.parse_unary()?;
                self.validate_assignment_target(&expr)?;
                Ok(Expression::Update(op, true, Box::new(expr)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        if !self.prev_line_terminator {
            let op = match self.current {
                Token::Increment => Some(UpdateOp::Increment),
                Token::Decrement => Some(UpdateOp::Decrement),
                _ => None,
            };
            if let Some(op) = op {
                self.validate_assignment_target(&expr)?;
                self.advance()?;
                return Ok(Expression::Update(op, false, Box::new(expr)));
            }
        }
        Ok(expr)
    }

    /// IdentifierName after `.`: reserved words and literals are fine here.
    fn parse_identifier_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.current {
            Token::Identifier(n) => n.clone(),
            Token::Keyword(kw) => kw.to_string(),
            Token::BooleanLiteral(b) => if *b { "true" } else { "false" }.to_string(),
            Token::NullLiteral => "null".to_string(),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(name)
    }

    /// `current` is `.` or `[`.
    fn parse_member_suffix(&mut self, expr: Expression) -> Result<Expression, ParseError> {
        if self.current == Token::Dot {
            self.advance()?;
            let name = self.parse_identifier_name()?;
            return Ok(Expression::Member(Box::new(expr), MemberProperty::Dot(name)));
        }
        self.eat(&Token::LeftBracket)?;
        let prop = self.allowing_in(|p| p.parse_expression())?;
        self.eat(&Token::RightBracket)?;
        Ok(Expression::Member(
            Box::new(expr),
            MemberProperty::Computed(Box::new(prop)),
        ))
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        loop {
            if self.current == Token::LeftParen {
                let args = self.parse_arguments()?;
                expr = Expression::Call(Box::new(expr), args);
                continue;
            }
            if matches!(self.current, Token::Dot | Token::LeftBracket) {
                expr = self.parse_member_suffix(expr)?;
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // new
        let mut callee = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        while matches!(self.current, Token::Dot | Token::LeftBracket) {
            callee = self.parse_member_suffix(callee)?;
        }
        let args = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        self.allowing_in(|p| {
            let mut args = Vec::new();
            while p.current != Token::RightParen {
                args.push(p.parse_assignment_expression()?);
                if p.current != Token::RightParen {
                    p.eat(&Token::Comma)?;
                }
            }
            p.eat(&Token::RightParen)?;
            Ok(args)
        })
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expression::This)
            }
            Token::Keyword(Keyword::Function) => self.parse_function_expression(),
            Token::Identifier(_) => {
                let name = self.expect_identifier()?;
                Ok(Expression::Identifier(name))
            }
            Token::NumericLiteral(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            Token::LegacyOctalLiteral(n) => {
                if self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode."));
                }
                let n = *n;
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            Token::StringLiteral(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expression::Literal(Literal::String(s)))
            }
            Token::BooleanLiteral(b) => {
                let b = *b;
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(b)))
            }
            Token::NullLiteral => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Null))
            }
            Token::Slash | Token::SlashAssign => {
                let prefix = if self.current == Token::SlashAssign { "=" } else { "" };
                let tok = self.lexer.lex_regex(prefix)?;
                // the lexer now sits after the literal; load the next token
                self.current = tok;
                self.current_token_end = self.lexer.offset();
                match self.advance()? {
                    Token::RegExpLiteral { pattern, flags } => {
                        Ok(Expression::Literal(Literal::RegExp(pattern, flags)))
                    }
                    _ => Err(self.error("Invalid regular expression")),
                }
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.allowing_in(|p| p.parse_expression())?;
                self.eat(&Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => self.allowing_in(|p| p.parse_array_literal()),
            Token::LeftBrace => self.allowing_in(|p| p.parse_object_literal()),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let mut elements = Vec::new();
        while self.current != Token::RightBracket {
            if self.current == Token::Comma {
                self.advance()?;
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment_expression()?));
            if self.current != Token::RightBracket {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_property_name(&mut self) -> Result<String, ParseError> {
        let key = match &self.current {
            Token::StringLiteral(s) => s.to_property_key(),
            Token::NumericLiteral(n) => number_ops::to_string(*n),
            Token::LegacyOctalLiteral(n) => {
                if self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode."));
                }
                number_ops::to_string(*n)
            }
            _ => return self.parse_identifier_name(),
        };
        self.advance()?;
        Ok(key)
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut props: Vec<Property> = Vec::new();
        while self.current != Token::RightBrace {
            let prop = self.parse_property_assignment()?;
            self.check_duplicate_property(&props, &prop)?;
            props.push(prop);
            if self.current != Token::RightBrace {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(Expression::Object(props))
    }

    fn parse_property_assignment(&mut self) -> Result<Property, ParseError> {
        let start = self.current_token_start;
        let accessor = match &self.current {
            Token::Identifier(n) if n == "get" => Some(PropertyKind::Get),
            Token::Identifier(n) if n == "set" => Some(PropertyKind::Set),
            _ => None,
        };
        let key = self.parse_property_name()?;
        if let Some(kind) = accessor
            && self.current != Token::Colon
        {
            let key = self.parse_property_name()?;
            let func = self.parse_function_rest(start, None)?;
            match kind {
                PropertyKind::Get if !func.params.is_empty() => {
                    return Err(self.error("Getter must not have any formal parameters."));
                }
                PropertyKind::Set if func.params.len() != 1 => {
                    return Err(self.error("Setter must have exactly one formal parameter."));
                }
                _ => {}
            }
            return Ok(Property {
                key,
                value: Expression::Function(func),
                kind,
            });
        }
        self.eat(&Token::Colon)?;
        let value = self.parse_assignment_expression()?;
        Ok(Property {
            key,
            value,
            kind: PropertyKind::Init,
        })
    }

    fn check_duplicate_property(&self, props: &[Property], prop: &Property) -> Result<(), ParseError> {
        for prev in props.iter().filter(|p| p.key == prop.key) {
            let clash = match (prev.kind, prop.kind) {
                (PropertyKind::Init, PropertyKind::Init) => self.strict,
                (PropertyKind::Init, _) | (_, PropertyKind::Init) => true,
                (a, b) => a == b,
            };
            if clash {
                return Err(self.error(format!(
                    "Duplicate data property in object literal not allowed: '{}'",
                    prop.key
                )));
            }
        }
        Ok(())
    }
}
