//! Expression productions.

use super::base::NodeIndex;
use super::node::{FunctionData, GenericKind, NodeData, PropertyKind};
use super::state::{ParseError, ParseResult, ParserState};
use hoist_common::diagnostics::diagnostic_codes;
use hoist_scanner::SyntaxKind;
use smallvec::{SmallVec, smallvec};

impl ParserState<'_> {
    /// Expression := AssignmentExpression (',' AssignmentExpression)*
    pub(crate) fn parse_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let first = self.parse_assignment_expression()?;
        if !self.is(SyntaxKind::CommaToken) {
            return Ok(first);
        }
        let mut expressions: SmallVec<[NodeIndex; 4]> = smallvec![first];
        while self.optional(SyntaxKind::CommaToken) {
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(self.finish_generic(start, GenericKind::SequenceExpression, expressions))
    }

    pub(crate) fn parse_assignment_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let left = self.parse_conditional_expression()?;
        if !self.token().is_assignment_operator() {
            return Ok(left);
        }
        self.check_assignment_target(left)?;
        self.next_token();
        let right = self.parse_assignment_expression()?;
        Ok(self.finish_generic(start, GenericKind::AssignmentExpression, smallvec![left, right]))
    }

    /// Only identifiers and member expressions can be assigned to.
    pub(crate) fn check_assignment_target(&self, target: NodeIndex) -> ParseResult<()> {
        match self.arena.get(target).map(|node| &node.data) {
            Some(NodeData::Identifier { .. } | NodeData::MemberExpression { .. }) => Ok(()),
            _ => {
                let span = self.arena.span(target).unwrap_or(self.scanner.token_span());
                Err(ParseError::new(
                    "Invalid left-hand side in assignment.",
                    span,
                    diagnostic_codes::INVALID_ASSIGNMENT_TARGET,
                ))
            }
        }
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let test = self.parse_binary_expression(0)?;
        if !self.optional(SyntaxKind::QuestionToken) {
            return Ok(test);
        }
        let consequent = self.with_allow_in(true, |p| p.parse_assignment_expression())?;
        self.expect(SyntaxKind::ColonToken)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(self.finish_generic(
            start,
            GenericKind::ConditionalExpression,
            smallvec![test, consequent, alternate],
        ))
    }

    /// Precedence climbing over the binary and logical operators.
    /// All of them are left-associative.
    fn parse_binary_expression(&mut self, min_precedence: u8) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let mut left = self.parse_unary_expression()?;
        loop {
            let operator = self.token();
            let precedence = operator.binary_precedence(self.allow_in);
            if precedence <= min_precedence {
                break;
            }
            self.next_token();
            let right = self.parse_binary_expression(precedence)?;
            let kind = match operator {
                SyntaxKind::BarBarToken | SyntaxKind::AmpersandAmpersandToken => {
                    GenericKind::LogicalExpression
                }
                _ => GenericKind::BinaryExpression,
            };
            left = self.finish_generic(start, kind, smallvec![left, right]);
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<NodeIndex> {
        self.enter_nesting()?;
        let result = self.parse_unary_expression_worker();
        self.exit_nesting();
        result
    }

    fn parse_unary_expression_worker(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        match self.token() {
            SyntaxKind::DeleteKeyword
            | SyntaxKind::VoidKeyword
            | SyntaxKind::TypeOfKeyword
            | SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::TildeToken
            | SyntaxKind::ExclamationToken => {
                self.next_token();
                let operand = self.parse_unary_expression()?;
                Ok(self.finish_generic(start, GenericKind::UnaryExpression, smallvec![operand]))
            }
            SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken => {
                self.next_token();
                let operand = self.parse_unary_expression()?;
                self.check_assignment_target(operand)?;
                Ok(self.finish_generic(start, GenericKind::UpdateExpression, smallvec![operand]))
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let expr = self.parse_left_hand_side_expression()?;
        if matches!(
            self.token(),
            SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken
        ) && !self.scanner.has_preceding_line_break()
        {
            self.check_assignment_target(expr)?;
            self.next_token();
            return Ok(self.finish_generic(start, GenericKind::UpdateExpression, smallvec![expr]));
        }
        Ok(expr)
    }

    fn parse_left_hand_side_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let mut expr = if self.is(SyntaxKind::NewKeyword) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        loop {
            expr = match self.token() {
                SyntaxKind::DotToken | SyntaxKind::OpenBracketToken => {
                    self.parse_member_access(start, expr)?
                }
                SyntaxKind::OpenParenToken => {
                    let mut children: SmallVec<[NodeIndex; 4]> = smallvec![expr];
                    children.extend(self.parse_arguments()?);
                    self.finish_generic(start, GenericKind::CallExpression, children)
                }
                _ => return Ok(expr),
            };
        }
    }

    /// `.name` or `[expr]` applied to `object`.
    fn parse_member_access(&mut self, start: u32, object: NodeIndex) -> ParseResult<NodeIndex> {
        let computed = self.is(SyntaxKind::OpenBracketToken);
        self.next_token();
        let property = if computed {
            let property = self.with_allow_in(true, |p| p.parse_expression())?;
            self.expect(SyntaxKind::CloseBracketToken)?;
            property
        } else {
            if !self.token().is_identifier_or_keyword() {
                return Err(self.unexpected("property name"));
            }
            let name_start = self.token_start();
            self.next_token();
            self.finish_generic(name_start, GenericKind::PropertyName, SmallVec::new())
        };
        Ok(self.finish_node(
            start,
            NodeData::MemberExpression {
                object,
                property,
                computed,
            },
        ))
    }

    fn parse_new_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::NewKeyword)?;
        let callee_start = self.token_start();
        let mut callee = if self.is(SyntaxKind::NewKeyword) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        while matches!(
            self.token(),
            SyntaxKind::DotToken | SyntaxKind::OpenBracketToken
        ) {
            callee = self.parse_member_access(callee_start, callee)?;
        }
        let mut children: SmallVec<[NodeIndex; 4]> = smallvec![callee];
        if self.is(SyntaxKind::OpenParenToken) {
            children.extend(self.parse_arguments()?);
        }
        Ok(self.finish_generic(start, GenericKind::NewExpression, children))
    }

    fn parse_arguments(&mut self) -> ParseResult<SmallVec<[NodeIndex; 4]>> {
        self.expect(SyntaxKind::OpenParenToken)?;
        self.with_allow_in(true, |p| {
            let mut arguments = SmallVec::new();
            while !p.is(SyntaxKind::CloseParenToken) {
                arguments.push(p.parse_assignment_expression()?);
                if !p.is(SyntaxKind::CloseParenToken) {
                    p.expect(SyntaxKind::CommaToken)?;
                }
            }
            p.expect(SyntaxKind::CloseParenToken)?;
            Ok(arguments)
        })
    }

    fn parse_primary_expression(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        match self.token() {
            SyntaxKind::ThisKeyword => {
                self.next_token();
                Ok(self.finish_node(start, NodeData::ThisExpression))
            }
            SyntaxKind::Identifier => self.parse_binding_identifier(),
            SyntaxKind::NumericLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::NullKeyword => self.parse_literal(),
            SyntaxKind::SlashToken | SyntaxKind::SlashEqualsToken => {
                self.re_scan_slash_token();
                self.parse_literal()
            }
            SyntaxKind::OpenParenToken => {
                self.next_token();
                let expr = self.with_allow_in(true, |p| p.parse_expression())?;
                self.expect(SyntaxKind::CloseParenToken)?;
                Ok(expr)
            }
            SyntaxKind::OpenBracketToken => self.parse_array_literal(),
            SyntaxKind::OpenBraceToken => self.parse_object_literal(),
            SyntaxKind::FunctionKeyword => self.parse_function(false),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_literal(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        Ok(self.finish_generic(start, GenericKind::Literal, SmallVec::new()))
    }

    fn parse_array_literal(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::OpenBracketToken)?;
        let elements = self.with_allow_in(true, |p| {
            let mut elements = SmallVec::new();
            while !p.is(SyntaxKind::CloseBracketToken) {
                // Holes produce no node.
                if p.optional(SyntaxKind::CommaToken) {
                    continue;
                }
                elements.push(p.parse_assignment_expression()?);
                if !p.is(SyntaxKind::CloseBracketToken) {
                    p.expect(SyntaxKind::CommaToken)?;
                }
            }
            Ok(elements)
        })?;
        self.expect(SyntaxKind::CloseBracketToken)?;
        Ok(self.finish_generic(start, GenericKind::ArrayExpression, elements))
    }

    fn parse_object_literal(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::OpenBraceToken)?;
        let properties = self.with_allow_in(true, |p| {
            let mut properties = SmallVec::new();
            while !p.is(SyntaxKind::CloseBraceToken) {
                properties.push(p.parse_object_property()?);
                if !p.is(SyntaxKind::CloseBraceToken) {
                    p.expect(SyntaxKind::CommaToken)?;
                }
            }
            Ok(properties)
        })?;
        self.expect(SyntaxKind::CloseBraceToken)?;
        Ok(self.finish_generic(start, GenericKind::ObjectExpression, properties))
    }

    fn parse_object_property(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let accessor = match self.scanner.token_text() {
            "get" if self.is(SyntaxKind::Identifier) => Some(PropertyKind::Get),
            "set" if self.is(SyntaxKind::Identifier) => Some(PropertyKind::Set),
            _ => None,
        };
        if let Some(kind) = accessor
            && self.peek_is_property_key()
        {
            self.next_token();
            let key = self.parse_property_key()?;
            let function_start = self.token_start();
            let (params, body) = self.parse_function_signature_and_body()?;
            let value = self.finish_node(
                function_start,
                NodeData::FunctionExpression(FunctionData {
                    id: NodeIndex::NONE,
                    params,
                    body,
                }),
            );
            return Ok(self.finish_node(start, NodeData::Property { key, value, kind }));
        }

        let key = self.parse_property_key()?;
        self.expect(SyntaxKind::ColonToken)?;
        let value = self.parse_assignment_expression()?;
        Ok(self.finish_node(
            start,
            NodeData::Property {
                key,
                value,
                kind: PropertyKind::Init,
            },
        ))
    }

    fn peek_is_property_key(&mut self) -> bool {
        let next = self.peek_token();
        next.is_identifier_or_keyword()
            || matches!(next, SyntaxKind::StringLiteral | SyntaxKind::NumericLiteral)
    }

    fn parse_property_key(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let kind = match self.token() {
            SyntaxKind::StringLiteral | SyntaxKind::NumericLiteral => GenericKind::Literal,
            token if token.is_identifier_or_keyword() => GenericKind::PropertyName,
            _ => return Err(self.unexpected("property name")),
        };
        self.next_token();
        Ok(self.finish_generic(start, kind, SmallVec::new()))
    }
}
