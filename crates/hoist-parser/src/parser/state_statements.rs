//! Statement and function productions.

use super::base::NodeIndex;
use super::node::{FunctionData, GenericKind, NodeData};
use super::state::{ParseError, ParseResult, ParserState};
use hoist_common::diagnostics::diagnostic_codes;
use hoist_scanner::SyntaxKind;
use smallvec::{SmallVec, smallvec};

impl ParserState<'_> {
    /// Parse statements until `terminator` (not consumed) or end of input.
    ///
    /// In tolerant mode a failing statement is recorded as a diagnostic and
    /// skipped; parsing resumes at the next statement boundary.
    pub(crate) fn parse_statement_list(
        &mut self,
        terminator: SyntaxKind,
    ) -> ParseResult<Vec<NodeIndex>> {
        let mut statements = Vec::new();
        while !self.is(terminator) && !self.is(SyntaxKind::EndOfFile) {
            let start = self.token_start();
            let (depth, in_function, allow_in) = (self.depth, self.in_function, self.allow_in);
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) if self.options.tolerant => {
                    self.depth = depth;
                    self.in_function = in_function;
                    self.allow_in = allow_in;
                    self.record_error(&error);
                    self.resynchronize(start);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(statements)
    }

    pub(crate) fn parse_statement(&mut self) -> ParseResult<NodeIndex> {
        self.enter_nesting()?;
        let result = self.parse_statement_worker();
        self.exit_nesting();
        result
    }

    fn parse_statement_worker(&mut self) -> ParseResult<NodeIndex> {
        match self.token() {
            SyntaxKind::OpenBraceToken => self.parse_block(),
            SyntaxKind::VarKeyword => self.parse_variable_statement(),
            SyntaxKind::SemicolonToken => {
                let start = self.token_start();
                self.next_token();
                Ok(self.finish_generic(start, GenericKind::EmptyStatement, SmallVec::new()))
            }
            SyntaxKind::FunctionKeyword => self.parse_function(true),
            SyntaxKind::IfKeyword => self.parse_if_statement(),
            SyntaxKind::ForKeyword => self.parse_for_statement(),
            SyntaxKind::WhileKeyword => self.parse_while_statement(),
            SyntaxKind::DoKeyword => self.parse_do_statement(),
            SyntaxKind::ReturnKeyword => self.parse_return_statement(),
            SyntaxKind::BreakKeyword => self.parse_jump_statement(GenericKind::BreakStatement),
            SyntaxKind::ContinueKeyword => {
                self.parse_jump_statement(GenericKind::ContinueStatement)
            }
            SyntaxKind::ThrowKeyword => self.parse_throw_statement(),
            SyntaxKind::TryKeyword => self.parse_try_statement(),
            SyntaxKind::SwitchKeyword => self.parse_switch_statement(),
            SyntaxKind::WithKeyword => self.parse_with_statement(),
            SyntaxKind::DebuggerKeyword => {
                let start = self.token_start();
                self.next_token();
                self.parse_semicolon()?;
                Ok(self.finish_generic(start, GenericKind::DebuggerStatement, SmallVec::new()))
            }
            SyntaxKind::Identifier if self.peek_token() == SyntaxKind::ColonToken => {
                self.parse_labeled_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    pub(crate) fn parse_block(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::OpenBraceToken)?;
        let statements = self.parse_statement_list(SyntaxKind::CloseBraceToken)?;
        self.expect(SyntaxKind::CloseBraceToken)?;
        Ok(self.finish_generic(
            start,
            GenericKind::BlockStatement,
            SmallVec::from_vec(statements),
        ))
    }

    fn parse_variable_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let declarators = self.parse_variable_declarators()?;
        self.parse_semicolon()?;
        Ok(self.finish_generic(start, GenericKind::VariableDeclaration, declarators))
    }

    fn parse_variable_declarators(&mut self) -> ParseResult<SmallVec<[NodeIndex; 4]>> {
        let mut declarators = SmallVec::new();
        loop {
            let start = self.token_start();
            let id = self.parse_binding_identifier()?;
            let init = if self.optional(SyntaxKind::EqualsToken) {
                self.parse_assignment_expression()?
            } else {
                NodeIndex::NONE
            };
            declarators.push(self.finish_node(start, NodeData::VariableDeclarator { id, init }));
            if !self.optional(SyntaxKind::CommaToken) {
                return Ok(declarators);
            }
        }
    }

    pub(crate) fn parse_binding_identifier(&mut self) -> ParseResult<NodeIndex> {
        if !self.is(SyntaxKind::Identifier) {
            return Err(self.unexpected("identifier"));
        }
        let start = self.token_start();
        let name = self.scanner.token_text().to_string();
        self.next_token();
        Ok(self.finish_node(start, NodeData::Identifier { name }))
    }

    fn parse_if_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let test = self.parse_parenthesized_expression()?;
        let consequent = self.parse_statement()?;
        let mut children: SmallVec<[NodeIndex; 4]> = smallvec![test, consequent];
        if self.optional(SyntaxKind::ElseKeyword) {
            children.push(self.parse_statement()?);
        }
        Ok(self.finish_generic(start, GenericKind::IfStatement, children))
    }

    fn parse_parenthesized_expression(&mut self) -> ParseResult<NodeIndex> {
        self.expect(SyntaxKind::OpenParenToken)?;
        let expr = self.with_allow_in(true, |p| p.parse_expression())?;
        self.expect(SyntaxKind::CloseParenToken)?;
        Ok(expr)
    }

    fn parse_for_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        self.expect(SyntaxKind::OpenParenToken)?;

        let mut children: SmallVec<[NodeIndex; 4]> = SmallVec::new();
        if self.is(SyntaxKind::VarKeyword) {
            let var_start = self.token_start();
            self.next_token();
            let declarators = self.with_allow_in(false, |p| p.parse_variable_declarators())?;
            let single = declarators.len() == 1;
            let declaration =
                self.finish_generic(var_start, GenericKind::VariableDeclaration, declarators);
            if single && self.is(SyntaxKind::InKeyword) {
                return self.parse_for_in_rest(start, declaration);
            }
            children.push(declaration);
        } else if !self.is(SyntaxKind::SemicolonToken) {
            let init = self.with_allow_in(false, |p| p.parse_expression())?;
            if self.is(SyntaxKind::InKeyword) {
                self.check_assignment_target(init)?;
                return self.parse_for_in_rest(start, init);
            }
            children.push(init);
        }

        self.expect(SyntaxKind::SemicolonToken)?;
        if !self.is(SyntaxKind::SemicolonToken) {
            children.push(self.with_allow_in(true, |p| p.parse_expression())?);
        }
        self.expect(SyntaxKind::SemicolonToken)?;
        if !self.is(SyntaxKind::CloseParenToken) {
            children.push(self.with_allow_in(true, |p| p.parse_expression())?);
        }
        self.expect(SyntaxKind::CloseParenToken)?;
        children.push(self.parse_statement()?);
        Ok(self.finish_generic(start, GenericKind::ForStatement, children))
    }

    fn parse_for_in_rest(&mut self, start: u32, left: NodeIndex) -> ParseResult<NodeIndex> {
        self.expect(SyntaxKind::InKeyword)?;
        let right = self.with_allow_in(true, |p| p.parse_expression())?;
        self.expect(SyntaxKind::CloseParenToken)?;
        let body = self.parse_statement()?;
        Ok(self.finish_generic(
            start,
            GenericKind::ForInStatement,
            smallvec![left, right, body],
        ))
    }

    fn parse_while_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let test = self.parse_parenthesized_expression()?;
        let body = self.parse_statement()?;
        Ok(self.finish_generic(start, GenericKind::WhileStatement, smallvec![test, body]))
    }

    fn parse_do_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let body = self.parse_statement()?;
        self.expect(SyntaxKind::WhileKeyword)?;
        let test = self.parse_parenthesized_expression()?;
        self.optional(SyntaxKind::SemicolonToken);
        Ok(self.finish_generic(start, GenericKind::DoWhileStatement, smallvec![body, test]))
    }

    fn parse_return_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        if !self.in_function {
            return Err(ParseError::new(
                "Illegal return statement.",
                self.scanner.token_span(),
                diagnostic_codes::UNEXPECTED_TOKEN,
            ));
        }
        self.next_token();
        let mut children = SmallVec::new();
        if !self.is(SyntaxKind::SemicolonToken) && !self.can_insert_semicolon() {
            children.push(self.parse_expression()?);
        }
        self.parse_semicolon()?;
        Ok(self.finish_generic(start, GenericKind::ReturnStatement, children))
    }

    fn parse_jump_statement(&mut self, kind: GenericKind) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let mut children = SmallVec::new();
        if self.is(SyntaxKind::Identifier) && !self.scanner.has_preceding_line_break() {
            children.push(self.parse_label()?);
        }
        self.parse_semicolon()?;
        Ok(self.finish_generic(start, kind, children))
    }

    fn parse_label(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::Identifier)?;
        Ok(self.finish_generic(start, GenericKind::Label, SmallVec::new()))
    }

    fn parse_throw_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        if self.scanner.has_preceding_line_break() {
            return Err(ParseError::new(
                "Illegal newline after throw.",
                self.scanner.token_span(),
                diagnostic_codes::UNEXPECTED_TOKEN,
            ));
        }
        let argument = self.parse_expression()?;
        self.parse_semicolon()?;
        Ok(self.finish_generic(start, GenericKind::ThrowStatement, smallvec![argument]))
    }

    fn parse_try_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let mut children: SmallVec<[NodeIndex; 4]> = smallvec![self.parse_block()?];

        let mut has_handler = false;
        if self.is(SyntaxKind::CatchKeyword) {
            let catch_start = self.token_start();
            self.next_token();
            self.expect(SyntaxKind::OpenParenToken)?;
            let param = self.parse_binding_identifier()?;
            self.expect(SyntaxKind::CloseParenToken)?;
            let body = self.parse_block()?;
            children.push(self.finish_generic(
                catch_start,
                GenericKind::CatchClause,
                smallvec![param, body],
            ));
            has_handler = true;
        }
        if self.optional(SyntaxKind::FinallyKeyword) {
            children.push(self.parse_block()?);
            has_handler = true;
        }
        if !has_handler {
            return Err(self.unexpected("'catch' or 'finally'"));
        }
        Ok(self.finish_generic(start, GenericKind::TryStatement, children))
    }

    fn parse_switch_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let discriminant = self.parse_parenthesized_expression()?;
        self.expect(SyntaxKind::OpenBraceToken)?;

        let mut children: SmallVec<[NodeIndex; 4]> = smallvec![discriminant];
        while !self.is(SyntaxKind::CloseBraceToken) {
            let case_start = self.token_start();
            let mut case_children: SmallVec<[NodeIndex; 4]> = SmallVec::new();
            if self.optional(SyntaxKind::CaseKeyword) {
                case_children.push(self.with_allow_in(true, |p| p.parse_expression())?);
            } else if !self.optional(SyntaxKind::DefaultKeyword) {
                return Err(self.unexpected("'case' or 'default'"));
            }
            self.expect(SyntaxKind::ColonToken)?;
            while !matches!(
                self.token(),
                SyntaxKind::CaseKeyword
                    | SyntaxKind::DefaultKeyword
                    | SyntaxKind::CloseBraceToken
                    | SyntaxKind::EndOfFile
            ) {
                case_children.push(self.parse_statement()?);
            }
            children.push(self.finish_generic(case_start, GenericKind::SwitchCase, case_children));
        }
        self.expect(SyntaxKind::CloseBraceToken)?;
        Ok(self.finish_generic(start, GenericKind::SwitchStatement, children))
    }

    fn parse_with_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.next_token();
        let object = self.parse_parenthesized_expression()?;
        let body = self.parse_statement()?;
        Ok(self.finish_generic(start, GenericKind::WithStatement, smallvec![object, body]))
    }

    fn parse_labeled_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let label = self.parse_label()?;
        self.expect(SyntaxKind::ColonToken)?;
        let body = self.parse_statement()?;
        Ok(self.finish_generic(start, GenericKind::LabeledStatement, smallvec![label, body]))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        let expr = self.parse_expression()?;
        self.parse_semicolon()?;
        Ok(self.finish_generic(start, GenericKind::ExpressionStatement, smallvec![expr]))
    }

    // Functions

    /// Parse `function name?(params) { body }` as a declaration or expression.
    pub(crate) fn parse_function(&mut self, is_declaration: bool) -> ParseResult<NodeIndex> {
        let start = self.token_start();
        self.expect(SyntaxKind::FunctionKeyword)?;
        let id = if self.is(SyntaxKind::Identifier) || is_declaration {
            self.parse_binding_identifier()?
        } else {
            NodeIndex::NONE
        };
        let (params, body) = self.parse_function_signature_and_body()?;
        let func = FunctionData { id, params, body };
        let data = if is_declaration {
            NodeData::FunctionDeclaration(func)
        } else {
            NodeData::FunctionExpression(func)
        };
        Ok(self.finish_node(start, data))
    }

    /// Parse `(params) { body }`, shared by functions and object accessors.
    pub(crate) fn parse_function_signature_and_body(
        &mut self,
    ) -> ParseResult<(SmallVec<[NodeIndex; 4]>, NodeIndex)> {
        self.expect(SyntaxKind::OpenParenToken)?;
        let mut params = SmallVec::new();
        while !self.is(SyntaxKind::CloseParenToken) {
            params.push(self.parse_binding_identifier()?);
            if !self.is(SyntaxKind::CloseParenToken) {
                self.expect(SyntaxKind::CommaToken)?;
            }
        }
        self.expect(SyntaxKind::CloseParenToken)?;

        let (saved_in_function, saved_allow_in) = (self.in_function, self.allow_in);
        self.in_function = true;
        self.allow_in = true;
        let body = self.parse_block();
        self.in_function = saved_in_function;
        self.allow_in = saved_allow_in;
        Ok((params, body?))
    }
}
